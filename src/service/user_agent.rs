use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::OnceLock;

use super::UNKNOWN;

/// Derived from the raw User-Agent on read, never stored. The stored UA
/// string stays the source of truth so the heuristics below can improve
/// without a data migration.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ParsedUserAgent {
    pub browser: String,
    pub version: String,
    pub os: String,
    pub device: String,
}

impl Default for ParsedUserAgent {
    fn default() -> Self {
        ParsedUserAgent {
            browser: UNKNOWN.into(),
            version: UNKNOWN.into(),
            os: UNKNOWN.into(),
            device: UNKNOWN.into(),
        }
    }
}

struct BrowserRule {
    name: &'static str,
    pattern: &'static str,
}

// First match wins. The in-house client comes first since its UA also
// carries the generic engine tokens, and Chrome must precede Safari for
// the same reason.
static BROWSER_RULES: &[BrowserRule] = &[
    BrowserRule {
        name: "MobileApp",
        pattern: r"MobileApp/([0-9.]+)",
    },
    BrowserRule {
        name: "Chrome",
        pattern: r"Chrome/([0-9.]+)",
    },
    BrowserRule {
        name: "Firefox",
        pattern: r"Firefox/([0-9.]+)",
    },
    BrowserRule {
        name: "Safari",
        pattern: r"Safari/([0-9.]+)",
    },
];

struct OsRule {
    pattern: &'static str,
    label: fn(&Captures) -> String,
}

static OS_RULES: &[OsRule] = &[
    OsRule {
        pattern: r"Windows NT ([0-9.]+)",
        label: |caps| format!("Windows {}", windows_marketing_name(&caps[1])),
    },
    OsRule {
        pattern: r"Mac OS X ([0-9_]+)",
        label: |caps| format!("macOS {}", caps[1].replace('_', ".")),
    },
    OsRule {
        pattern: r"Android ([0-9.]+)",
        label: |caps| format!("Android {}", &caps[1]),
    },
    OsRule {
        pattern: r"iPhone OS ([0-9_]+)",
        label: |caps| format!("iOS {}", caps[1].replace('_', ".")),
    },
    OsRule {
        pattern: r"Linux",
        label: |_| "Linux".to_owned(),
    },
];

// Apple devices by name, everything else by model code conventions
// (two-or-more-letter vendor prefix with a hyphenated code, or Pixel).
static DEVICE_PATTERNS: &[&str] = &[
    r"(iPhone|iPad|iPod)",
    r"([A-Z]{2,}-[A-Z0-9]+|SM-[A-Z0-9]+|Pixel [0-9]+)",
];

fn browser_regexes() -> &'static [Regex] {
    static CACHE: OnceLock<Vec<Regex>> = OnceLock::new();
    CACHE.get_or_init(|| {
        BROWSER_RULES
            .iter()
            .map(|rule| Regex::new(rule.pattern).unwrap())
            .collect()
    })
}

fn os_regexes() -> &'static [Regex] {
    static CACHE: OnceLock<Vec<Regex>> = OnceLock::new();
    CACHE.get_or_init(|| {
        OS_RULES
            .iter()
            .map(|rule| Regex::new(rule.pattern).unwrap())
            .collect()
    })
}

fn device_regexes() -> &'static [Regex] {
    static CACHE: OnceLock<Vec<Regex>> = OnceLock::new();
    CACHE.get_or_init(|| {
        DEVICE_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern).unwrap())
            .collect()
    })
}

fn parenthesized_segment() -> &'static Regex {
    static CACHE: OnceLock<Regex> = OnceLock::new();
    CACHE.get_or_init(|| Regex::new(r"\(([^)]+)\)").unwrap())
}

/// Pure and total, every unmatched category stays "Unknown".
pub fn parse(user_agent: &str) -> ParsedUserAgent {
    let mut parsed = ParsedUserAgent::default();

    for (rule, regex) in BROWSER_RULES.iter().zip(browser_regexes()) {
        if let Some(caps) = regex.captures(user_agent) {
            parsed.browser = rule.name.to_owned();
            parsed.version = caps[1].to_owned();
            break;
        }
    }

    for (rule, regex) in OS_RULES.iter().zip(os_regexes()) {
        if let Some(caps) = regex.captures(user_agent) {
            parsed.os = (rule.label)(&caps);
            break;
        }
    }

    if let Some(device) = detect_device(user_agent) {
        parsed.device = device;
    }

    parsed
}

fn detect_device(user_agent: &str) -> Option<String> {
    let segment = parenthesized_segment()
        .captures(user_agent)?
        .get(1)?
        .as_str();
    device_regexes().iter().find_map(|regex| {
        regex
            .captures(segment)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_owned())
    })
}

fn windows_marketing_name(nt_version: &str) -> String {
    static VERSIONS: &[(&str, &str)] = &[
        ("10.0", "10"),
        ("6.3", "8.1"),
        ("6.2", "8"),
        ("6.1", "7"),
        ("6.0", "Vista"),
        ("5.1", "XP"),
    ];
    VERSIONS
        .iter()
        .find(|(nt, _)| *nt == nt_version)
        .map(|(_, name)| (*name).to_owned())
        .unwrap_or_else(|| nt_version.to_owned())
}

#[cfg(test)]
mod test {
    use super::{parse, ParsedUserAgent};

    #[test]
    fn empty_input_yields_all_unknown() {
        assert_eq!(ParsedUserAgent::default(), parse(""));
    }

    #[test]
    fn chrome_on_windows_10() {
        let parsed = parse(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36",
        );
        assert_eq!("Chrome", parsed.browser);
        assert_eq!("117.0.0.0", parsed.version);
        assert_eq!("Windows 10", parsed.os);
        assert_eq!("Unknown", parsed.device);
    }

    #[test]
    fn iphone_underscore_version_normalized() {
        let parsed = parse(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 16_2 like Mac OS X) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/16.2 Mobile/15E148 Safari/604.1",
        );
        assert_eq!("iOS 16.2", parsed.os);
        assert_eq!("iPhone", parsed.device);
        assert_eq!("Safari", parsed.browser);
    }

    #[test]
    fn windows_7_marketing_name() {
        let parsed = parse("Mozilla/5.0 (Windows NT 6.1; WOW64; rv:54.0) Gecko/20100101 Firefox/54.0");
        assert_eq!("Windows 7", parsed.os);
        assert_eq!("Firefox", parsed.browser);
        assert_eq!("54.0", parsed.version);
    }

    #[test]
    fn unknown_windows_build_passes_through() {
        let parsed = parse("Mozilla/5.0 (Windows NT 9.9)");
        assert_eq!("Windows 9.9", parsed.os);
    }

    #[test]
    fn android_device_model() {
        let parsed = parse(
            "Mozilla/5.0 (Linux; Android 13; SM-G991B) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/112.0.0.0 Mobile Safari/537.36",
        );
        assert_eq!("Android 13", parsed.os);
        assert_eq!("SM-G991B", parsed.device);
        assert_eq!("Chrome", parsed.browser);
    }

    #[test]
    fn pixel_device_model() {
        let parsed = parse("Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36");
        assert_eq!("Pixel 8", parsed.device);
    }

    #[test]
    fn in_house_client_beats_engine_tokens() {
        let parsed = parse("MobileApp/2.4.1 (iPhone; CPU iPhone OS 16_2 like Mac OS X) Safari/604.1");
        assert_eq!("MobileApp", parsed.browser);
        assert_eq!("2.4.1", parsed.version);
        assert_eq!("iOS 16.2", parsed.os);
        assert_eq!("iPhone", parsed.device);
    }

    #[test]
    fn bare_linux() {
        let parsed = parse("Mozilla/5.0 (X11; Linux x86_64)");
        assert_eq!("Linux", parsed.os);
    }

    #[test]
    fn macos_underscores_normalized() {
        let parsed = parse("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Safari/605.1.15");
        assert_eq!("macOS 10.15.7", parsed.os);
    }
}
