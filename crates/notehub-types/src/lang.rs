use phf::phf_map;

/// Language tags accepted by the playground, mapped to the numeric
/// identifiers of the remote execution service.
static EXECUTION_LANGUAGES: phf::Map<&'static str, u32> = phf_map! {
    "c" => 50,      // C (GCC 9.2.0)
    "cpp" => 54,    // C++ (GCC 9.2.0)
    "java" => 62,   // Java (OpenJDK 13)
    "python" => 71, // Python (3.8.1)
    "js" => 63,     // JavaScript (Node.js 12.14.0)
};

pub fn execution_language_id(tag: &str) -> Option<u32> {
    EXECUTION_LANGUAGES.get(tag).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_languages() {
        assert_eq!(execution_language_id("python"), Some(71));
        assert_eq!(execution_language_id("c"), Some(50));
        assert_eq!(execution_language_id("js"), Some(63));
    }

    #[test]
    fn test_unknown_language() {
        assert_eq!(execution_language_id("ruby"), None);
        assert_eq!(execution_language_id(""), None);
        assert_eq!(execution_language_id("Python"), None);
    }

    #[test]
    fn test_supported_count() {
        assert_eq!(EXECUTION_LANGUAGES.len(), 5);
    }
}
