use std::io::{Write, stdout};

use base64::Engine;

use crate::app::{Message, Model, Overlay, ToastLevel};
use crate::export::{PNG_FILE_NAME, SVG_FILE_NAME, export_png, export_svg};

/// Run the filesystem and clipboard work a message asks for.
pub(super) fn handle_message_side_effects(model: &mut Model, msg: &Message) {
    match msg {
        Message::CopySource => copy_source(model),
        Message::ShareLink | Message::CopyShareLink => copy_share_link(model),
        Message::ExportSvg => export_diagram(model, ExportKind::Svg),
        Message::ExportPng => export_diagram(model, ExportKind::Png),
        _ => {}
    }
}

#[derive(Debug, Clone, Copy)]
enum ExportKind {
    Svg,
    Png,
}

fn export_diagram(model: &mut Model, kind: ExportKind) {
    let _scope = crate::perf::scope("app.export");
    let artifact = model.pipeline.last_good();
    let result = match kind {
        ExportKind::Svg => export_svg(artifact, &model.export_dir.join(SVG_FILE_NAME)),
        ExportKind::Png => export_png(artifact, &model.export_dir.join(PNG_FILE_NAME)),
    };
    match result {
        Ok(path) => {
            crate::perf::log_event("export.ok", format!("path={}", path.display()));
            model.show_toast(ToastLevel::Info, format!("Exported {}", path.display()));
        }
        Err(err) => {
            tracing::warn!(%err, ?kind, "export failed");
            model.show_toast(ToastLevel::Error, format!("Export failed: {err}"));
        }
    }
}

fn copy_source(model: &mut Model) {
    match copy_to_clipboard(&model.editor.text()) {
        Ok(()) => model.show_toast(ToastLevel::Info, "Code copied to clipboard"),
        Err(err) => {
            tracing::warn!(%err, "clipboard copy failed");
            model.show_toast(ToastLevel::Error, format!("Copy failed: {err}"));
        }
    }
}

fn copy_share_link(model: &mut Model) {
    let Some(Overlay::Share(link)) = model.overlay.as_ref() else {
        return;
    };
    match copy_to_clipboard(link) {
        Ok(()) => model.show_toast(ToastLevel::Info, "Link copied to clipboard"),
        Err(err) => {
            tracing::warn!(%err, "clipboard copy failed");
            model.show_toast(ToastLevel::Error, format!("Copy failed: {err}"));
        }
    }
}

fn copy_to_clipboard(text: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        if copy_to_pbcopy(text).is_ok() {
            return Ok(());
        }
    }
    copy_to_clipboard_osc52(text)
}

#[cfg(target_os = "macos")]
fn copy_to_pbcopy(text: &str) -> std::io::Result<()> {
    use std::process::{Command, Stdio};

    let mut child = Command::new("pbcopy").stdin(Stdio::piped()).spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes())?;
    }
    let status = child.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other("pbcopy failed"))
    }
}

fn copy_to_clipboard_osc52(text: &str) -> std::io::Result<()> {
    let osc = osc52_sequence(text);
    let mut out = stdout();
    out.write_all(osc.as_bytes())?;
    out.flush()
}

fn osc52_sequence(text: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{encoded}\x07")
}
