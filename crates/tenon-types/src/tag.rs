use serde::{Deserialize, Serialize};

/// Role a parent feature plays for a child, carried on dependency edges.
///
/// Tags are plain strings under the hood ("target", "tool0", "tool1", ...);
/// the constructors cover the conventional roles so call sites do not spell
/// them out by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputTag(String);

impl InputTag {
    pub fn new(tag: impl Into<String>) -> Self {
        InputTag(tag.into())
    }

    /// The shape being operated on.
    pub fn target() -> Self {
        InputTag("target".to_string())
    }

    /// The nth shape applied against the target ("tool0", "tool1", ...).
    pub fn tool(index: usize) -> Self {
        InputTag(format!("tool{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for "tool0", "tool1", ... of any index.
    pub fn is_tool(&self) -> bool {
        self.0
            .strip_prefix("tool")
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    }
}

impl std::fmt::Display for InputTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventional_tags_spell_correctly() {
        assert_eq!(InputTag::target().as_str(), "target");
        assert_eq!(InputTag::tool(0).as_str(), "tool0");
        assert_eq!(InputTag::tool(12).as_str(), "tool12");
    }

    #[test]
    fn tool_detection() {
        assert!(InputTag::tool(3).is_tool());
        assert!(!InputTag::target().is_tool());
        assert!(!InputTag::new("toolbox").is_tool());
        assert!(!InputTag::new("tool").is_tool());
    }
}
