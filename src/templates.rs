//! Starter diagrams: a few built in, plus any `*.mermaid` files in a
//! user-supplied directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::state::{DiagramDocument, Theme, codec};

/// File extension that marks a template.
pub const TEMPLATE_EXTENSION: &str = ".mermaid";

const BUILTIN: [(&str, &str); 4] = [
    (
        "flowchart.mermaid",
        "flowchart TD
  A[Christmas] -->|Get money| B(Go shopping)
  B --> C{Let me think}
  C -->|One| D[Laptop]
  C -->|Two| E[iPhone]
  C -->|Three| F[Car]",
    ),
    ("sequence-diagram.mermaid", crate::state::DEFAULT_DIAGRAM_CODE),
    (
        "class-diagram.mermaid",
        "classDiagram
  Animal <|-- Duck
  Animal <|-- Fish
  Animal : +int age
  Animal : +String gender
  Animal: +isMammal()
  class Duck{
    +String beakColor
    +swim()
    +quack()
  }
  class Fish{
    -int sizeInFeet
    -canEat()
  }",
    ),
    (
        "state-diagram.mermaid",
        "stateDiagram-v2
  [*] --> Still
  Still --> [*]
  Still --> Moving
  Moving --> Still
  Moving --> Crash
  Crash --> [*]",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    Builtin(&'static str),
    File(PathBuf),
}

/// One selectable template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    file_name: String,
    display_name: String,
    origin: Origin,
}

impl Template {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub const fn is_builtin(&self) -> bool {
        matches!(self.origin, Origin::Builtin(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    /// Only the built-in templates.
    pub fn builtin() -> Self {
        let templates = BUILTIN
            .iter()
            .map(|(file_name, code)| Template {
                file_name: (*file_name).to_string(),
                display_name: format_template_name(file_name),
                origin: Origin::Builtin(code),
            })
            .collect();
        Self { templates }
    }

    /// Built-ins followed by the directory's templates, sorted by file name.
    ///
    /// An unreadable directory is logged and contributes nothing.
    pub fn with_dir(dir: &Path) -> Self {
        let mut library = Self::builtin();
        let mut found = list_template_files(dir);
        found.sort();
        library
            .templates
            .extend(found.into_iter().map(|(file_name, path)| Template {
                display_name: format_template_name(&file_name),
                file_name,
                origin: Origin::File(path),
            }));
        library
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Template> {
        self.templates.get(index)
    }

    /// Contents of the template named `file_name`.
    ///
    /// Returns an empty string, after logging, if it is unknown or unreadable.
    pub fn load(&self, file_name: &str) -> String {
        let Some(template) = self.templates.iter().find(|t| t.file_name == file_name) else {
            tracing::warn!(file_name, "unknown template");
            return String::new();
        };
        match &template.origin {
            Origin::Builtin(code) => (*code).to_string(),
            Origin::File(path) => fs::read_to_string(path).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), %err, "failed to load template");
                String::new()
            }),
        }
    }
}

fn list_template_files(dir: &Path) -> Vec<(String, PathBuf)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), %err, "failed to list templates");
            return Vec::new();
        }
    };
    entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_file()))
        .filter_map(|entry| {
            let file_name = entry.file_name().into_string().ok()?;
            file_name
                .ends_with(TEMPLATE_EXTENSION)
                .then(|| (file_name, entry.path()))
        })
        .collect()
}

/// `user-journey.mermaid` becomes `User Journey`.
pub fn format_template_name(file_name: &str) -> String {
    file_name
        .replacen(TEMPLATE_EXTENSION, "", 1)
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shareable link that opens `code` with `theme`.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn share_url_for(code: &str, theme: Theme, origin: &str) -> Result<String, serde_json::Error> {
    let encoded = codec::encode(&DiagramDocument::new(code, theme))?;
    Ok(codec::share_url(origin, "/", &encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_template_name() {
        assert_eq!(format_template_name("user-journey.mermaid"), "User Journey");
        assert_eq!(format_template_name("flowchart.mermaid"), "Flowchart");
        assert_eq!(format_template_name("git-graph"), "Git Graph");
    }

    #[test]
    fn test_builtin_library() {
        let library = TemplateLibrary::builtin();
        assert_eq!(library.len(), 4);
        assert!(library.templates().iter().all(Template::is_builtin));
        assert_eq!(library.get(1).map(Template::display_name), Some("Sequence Diagram"));
        assert!(library.load("flowchart.mermaid").starts_with("flowchart TD"));
    }

    #[test]
    fn test_with_dir_lists_sorted_mermaid_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pie-chart.mermaid"), "pie\n  \"A\" : 1").unwrap();
        fs::write(dir.path().join("gantt.mermaid"), "gantt").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let library = TemplateLibrary::with_dir(dir.path());
        let names: Vec<_> = library.templates()[4..]
            .iter()
            .map(Template::file_name)
            .collect();
        assert_eq!(names, vec!["gantt.mermaid", "pie-chart.mermaid"]);
        assert_eq!(library.load("gantt.mermaid"), "gantt");
    }

    #[test]
    fn test_missing_dir_falls_back_to_builtins() {
        let dir = TempDir::new().unwrap();
        let library = TemplateLibrary::with_dir(&dir.path().join("nope"));
        assert_eq!(library.len(), 4);
    }

    #[test]
    fn test_load_failures_return_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.mermaid");
        fs::write(&path, "graph TD").unwrap();
        let library = TemplateLibrary::with_dir(dir.path());
        fs::remove_file(&path).unwrap();

        assert_eq!(library.load("gone.mermaid"), "");
        assert_eq!(library.load("unknown.mermaid"), "");
    }

    #[test]
    fn test_share_url_for_decodes_back() {
        let url = share_url_for("graph TD; A-->B", Theme::Forest, "https://example.com/").unwrap();
        let payload = url.strip_prefix("https://example.com/?data=").unwrap();
        let doc = codec::decode(payload, Theme::Default).unwrap();
        assert_eq!(doc.source_text, "graph TD; A-->B");
        assert_eq!(doc.theme, Theme::Forest);
    }
}
