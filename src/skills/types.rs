//! Skill Type Definitions
//!
//! Core data structures for the skill system, and the on-disk format of a
//! skill's metadata file:
//!
//! ```text
//! ---
//! name: archive_old_files
//! description: Move stale files into Archive
//! ---
//!
//! Long-form description...
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata file inside each skill directory
pub const METADATA_FILE: &str = "SKILL.md";

/// Executable body inside each skill directory
pub const SCRIPT_FILE: &str = "script.py";

/// Front-matter delimiter line
pub const FRONT_MATTER_DELIMITER: &str = "---";

static UNSAFE_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]").expect("static regex"));

/// Technical name for a skill: lowercase, anything outside `[a-zA-Z0-9_]`
/// replaced with `_`. `"Archive Old Files!"` becomes `archive_old_files_`.
pub fn sanitize_name(name: &str) -> String {
    UNSAFE_NAME_CHARS.replace_all(name, "_").to_lowercase()
}

/// A discovered skill
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillDefinition {
    /// Technical name from the metadata block
    pub name: String,
    /// One-line description from the metadata block
    pub description: String,
    /// Free text following the metadata block
    pub long_description: String,
    /// Owning directory
    pub dir: PathBuf,
    /// Script body, when the script file is present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl SkillDefinition {
    pub fn script_path(&self) -> PathBuf {
        self.dir.join(SCRIPT_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Parse a metadata file's contents
    pub fn parse(content: &str, dir: &Path) -> Result<Self, SkillError> {
        let (block, body) = split_front_matter(content).ok_or(SkillError::MissingFrontMatter)?;

        let front: FrontMatter =
            serde_yaml::from_str(&block).map_err(|e| SkillError::InvalidFrontMatter(e.to_string()))?;

        let name = front
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(SkillError::MissingField("name"))?;
        let description = front
            .description
            .filter(|d| !d.trim().is_empty())
            .ok_or(SkillError::MissingField("description"))?;

        Ok(Self {
            name,
            description,
            long_description: body.trim().to_string(),
            dir: dir.to_path_buf(),
            script: None,
        })
    }
}

/// Split on whole delimiter lines: the first line opens the block and the
/// next line equal to the delimiter closes it.
fn split_front_matter(content: &str) -> Option<(String, String)> {
    let mut lines = content.lines();
    if lines.next()?.trim_end() != FRONT_MATTER_DELIMITER {
        return None;
    }

    let mut block = String::new();
    loop {
        let line = lines.next()?;
        if line.trim_end() == FRONT_MATTER_DELIMITER {
            break;
        }
        block.push_str(line);
        block.push('\n');
    }

    Some((block, lines.collect::<Vec<_>>().join("\n")))
}

/// Key/value block at the top of a metadata file
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Render a metadata file for `name`
pub fn render_metadata(name: &str, description: &str) -> String {
    let front = FrontMatter {
        name: Some(name.to_string()),
        description: Some(description.to_string()),
    };
    // Fall back to plain key/value lines if YAML rendering ever fails
    let block = serde_yaml::to_string(&front)
        .unwrap_or_else(|_| format!("name: {}\ndescription: {}\n", name, description));

    format!(
        "{delim}\n{block}{delim}\n\n{description}\n",
        delim = FRONT_MATTER_DELIMITER,
        block = block,
        description = description
    )
}

/// Skill registry errors
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("Missing front matter block")]
    MissingFrontMatter,

    #[error("Invalid front matter: {0}")]
    InvalidFrontMatter(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid skill name: {0:?}")]
    InvalidName(String),

    #[error("Skill '{0}' does not exist. Use create_skill first.")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Archive Old Files!"), "archive_old_files_");
        assert_eq!(sanitize_name("already_safe_1"), "already_safe_1");
        assert_eq!(sanitize_name("a-b.c"), "a_b_c");
        assert_eq!(sanitize_name("Ünï"), "_n_");
    }

    #[test]
    fn test_parse_metadata() {
        let content = "---\nname: weekly_report\ndescription: Build the weekly report\n---\n\nCollects files.\n";
        let skill = SkillDefinition::parse(content, Path::new("/skills/weekly_report")).unwrap();

        assert_eq!(skill.name, "weekly_report");
        assert_eq!(skill.description, "Build the weekly report");
        assert_eq!(skill.long_description, "Collects files.");
        assert_eq!(skill.script_path(), Path::new("/skills/weekly_report/script.py"));
    }

    #[test]
    fn test_parse_missing_description() {
        let content = "---\nname: broken\n---\n\nNo description key.\n";
        let err = SkillDefinition::parse(content, Path::new("/skills/broken")).unwrap_err();
        assert!(matches!(err, SkillError::MissingField("description")));
    }

    #[test]
    fn test_parse_without_front_matter() {
        let err = SkillDefinition::parse("# Just markdown\n", Path::new("/x")).unwrap_err();
        assert!(matches!(err, SkillError::MissingFrontMatter));

        let err = SkillDefinition::parse("---\nname: open\n", Path::new("/x")).unwrap_err();
        assert!(matches!(err, SkillError::MissingFrontMatter));
    }

    #[test]
    fn test_render_round_trips_awkward_description() {
        let text = render_metadata("colon_skill", "Step one: list files; step two: archive");
        let skill = SkillDefinition::parse(&text, Path::new("/s")).unwrap();
        assert_eq!(skill.description, "Step one: list files; step two: archive");
        assert!(text.starts_with("---\nname: colon_skill\n"));
    }

    #[test]
    fn test_delimiter_inside_description_is_text() {
        let text = render_metadata("steps", "Step one --- step two");
        let skill = SkillDefinition::parse(&text, Path::new("/s")).unwrap();

        assert_eq!(skill.name, "steps");
        assert_eq!(skill.description, "Step one --- step two");
        assert_eq!(skill.long_description, "Step one --- step two");
    }

    #[test]
    fn test_opening_line_must_be_delimiter_alone() {
        let content = "---name: x\ndescription: y\n---\n";
        let err = SkillDefinition::parse(content, Path::new("/x")).unwrap_err();
        assert!(matches!(err, SkillError::MissingFrontMatter));
    }
}
