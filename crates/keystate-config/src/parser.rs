//! KDL configuration parser

use std::path::Path;

use crate::error::ConfigError;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl is built against an older miette, so the span is rebuilt by hand
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            "timing" => {
                config.timing = parse_timing(node)?;
            }
            "bindings" => {
                config.bindings.extend(parse_bindings(node)?);
            }
            "device" => {
                let path = first_string(node).ok_or_else(|| ConfigError::MissingField {
                    field: "device path (e.g., `device \"/dev/input/event3\"`)".to_string(),
                })?;
                config.device = Some(shellexpand::tilde(path).into_owned().into());
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

fn first_string(node: &kdl::KdlNode) -> Option<&str> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
}

fn property<'a>(node: &'a kdl::KdlNode, name: &str) -> Option<&'a kdl::KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value() == name).unwrap_or(false))
        .map(|e| e.value())
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    if let Some(val) = first_string(child) {
                        global.log_level = val
                            .parse()
                            .map_err(|e| ConfigError::Invalid { message: e })?;
                    }
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_timing(node: &kdl::KdlNode) -> Result<TimingConfig, ConfigError> {
    let mut timing = TimingConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let name = child.name().value();
            let slot = match name {
                "frame-interval-ms" => &mut timing.frame_interval_ms,
                "sequence-timeout-ms" => &mut timing.sequence_timeout_ms,
                "focus-guard-ms" => &mut timing.focus_guard_ms,
                other => {
                    tracing::warn!("Unknown timing option: {}", other);
                    continue;
                }
            };

            let value = child
                .entries()
                .first()
                .and_then(|e| e.value().as_i64())
                .ok_or_else(|| ConfigError::Invalid {
                    message: format!("'{}' expects an integer number of milliseconds", name),
                })?;

            if value <= 0 {
                return Err(ConfigError::InvalidTiming {
                    option: name.to_string(),
                    value,
                });
            }
            *slot = value as u64;
        }
    }

    Ok(timing)
}

fn parse_bindings(node: &kdl::KdlNode) -> Result<Vec<Binding>, ConfigError> {
    let mut bindings = Vec::new();

    let Some(children) = node.children() else {
        return Ok(bindings);
    };

    for child in children.nodes() {
        if child.name().value() != "bind" {
            tracing::warn!("Unknown bindings entry: {}", child.name().value());
            continue;
        }

        let combo = first_string(child)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "bind combo (e.g., `bind \"ctrl+s\" action=\"save\"`)".to_string(),
            })?;

        let action = property(child, "action")
            .and_then(|v| v.as_string())
            .ok_or_else(|| ConfigError::MissingField {
                field: format!("action for binding '{}'", combo),
            })?;

        let mut binding = Binding::new(combo, action);

        if let Some(v) = property(child, "prevent-default") {
            binding.prevent_default = expect_bool(v, "prevent-default", combo)?;
        }
        if let Some(v) = property(child, "allow-in-editable") {
            binding.allow_in_editable = expect_bool(v, "allow-in-editable", combo)?;
        }
        if let Some(v) = property(child, "enabled") {
            binding.enabled = expect_bool(v, "enabled", combo)?;
        }
        if let Some(v) = property(child, "hold-ms") {
            let ms = v
                .as_i64()
                .filter(|ms| *ms >= 0)
                .ok_or_else(|| invalid_binding(combo, "hold-ms", "a non-negative integer"))?;
            binding.hold_ms = ms as u64;
        }
        if let Some(v) = property(child, "classes") {
            let classes = v
                .as_string()
                .ok_or_else(|| invalid_binding(combo, "classes", "a string"))?;
            binding.classes = classes.split_whitespace().map(str::to_string).collect();
        }

        bindings.push(binding);
    }

    Ok(bindings)
}

fn expect_bool(value: &kdl::KdlValue, option: &str, combo: &str) -> Result<bool, ConfigError> {
    value
        .as_bool()
        .ok_or_else(|| invalid_binding(combo, option, "true or false"))
}

fn invalid_binding(combo: &str, option: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidBinding {
        combo: combo.to_string(),
        option: option.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_config() {
        let config = r#"
            global {
                log-level "debug"
            }

            bindings {
                bind "ctrl+s" action="save"
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.global.log_level, LogLevel::Debug);
        assert_eq!(result.bindings.len(), 1);
        assert_eq!(result.bindings[0].combo, "ctrl+s");
        assert_eq!(result.bindings[0].action, "save");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let result = parse_config_str("").unwrap();
        assert_eq!(result.global.log_level, LogLevel::Info);
        assert_eq!(result.timing, TimingConfig::default());
        assert!(result.bindings.is_empty());
        assert!(result.device.is_none());
    }

    #[test]
    fn test_timing_overrides() {
        let config = r#"
            timing {
                frame-interval-ms 8
                sequence-timeout-ms 750
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.timing.frame_interval_ms, 8);
        assert_eq!(result.timing.sequence_timeout_ms, 750);
        // Untouched value keeps its default
        assert_eq!(result.timing.focus_guard_ms, 100);
    }

    #[test]
    fn test_zero_timing_rejected() {
        let config = r#"
            timing {
                focus-guard-ms 0
            }
        "#;

        match parse_config_str(config) {
            Err(ConfigError::InvalidTiming { option, value }) => {
                assert_eq!(option, "focus-guard-ms");
                assert_eq!(value, 0);
            }
            other => panic!("Expected InvalidTiming error, got: {:?}", other),
        }
    }

    #[test]
    fn test_binding_options() {
        let config = r#"
            bindings {
                bind "space" action="boost" hold-ms=500 prevent-default=true
                bind "ctrl+k" action="search" classes="editor modal" allow-in-editable=true
                bind "g i" action="goto-inbox" enabled=false
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.bindings.len(), 3);

        let boost = &result.bindings[0];
        assert_eq!(boost.hold_ms, 500);
        assert!(boost.prevent_default);
        assert!(boost.enabled);

        let search = &result.bindings[1];
        assert_eq!(search.classes, vec!["editor".to_string(), "modal".to_string()]);
        assert!(search.allow_in_editable);
        assert!(!search.prevent_default);

        let inbox = &result.bindings[2];
        assert_eq!(inbox.combo, "g i");
        assert!(!inbox.enabled);
    }

    #[test]
    fn test_binding_missing_action_error() {
        let config = r#"
            bindings {
                bind "ctrl+s"
            }
        "#;

        match parse_config_str(config) {
            Err(ConfigError::MissingField { field }) => {
                assert!(field.contains("ctrl+s"));
            }
            other => panic!("Expected MissingField error, got: {:?}", other),
        }
    }

    #[test]
    fn test_binding_empty_combo_error() {
        let config = r#"
            bindings {
                bind "  " action="nothing"
            }
        "#;

        assert!(matches!(
            parse_config_str(config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_negative_hold_rejected() {
        let config = r#"
            bindings {
                bind "a" action="x" hold-ms=-5
            }
        "#;

        match parse_config_str(config) {
            Err(ConfigError::InvalidBinding { combo, option, .. }) => {
                assert_eq!(combo, "a");
                assert_eq!(option, "hold-ms");
            }
            other => panic!("Expected InvalidBinding error, got: {:?}", other),
        }
    }

    #[test]
    fn test_non_boolean_option_rejected() {
        let config = r#"
            bindings {
                bind "ctrl+s" action="save" enabled="yes"
            }
        "#;

        let err = parse_config_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBinding { expected: "true or false", .. }));
        assert_eq!(
            err.to_string(),
            "enabled for binding 'ctrl+s' must be true or false"
        );
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let config = r#"
            global {
                log-level "loud"
            }
        "#;

        match parse_config_str(config) {
            Err(ConfigError::Invalid { message }) => {
                assert!(message.contains("loud"));
            }
            other => panic!("Expected Invalid error, got: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_kdl_reports_parse_error() {
        let result = parse_config_str("bindings {");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_tilde_expansion_in_device_path() {
        let config = r#"
            device "~/devices/keyboard"
        "#;

        let result = parse_config_str(config).unwrap();
        let path = result.device.expect("device should be set");
        let path_str = path.to_string_lossy();

        assert!(
            !path_str.starts_with('~'),
            "Tilde should be expanded, but got: {}",
            path_str
        );
        assert!(
            path_str.ends_with("/devices/keyboard"),
            "Path should keep its suffix, but got: {}",
            path_str
        );
    }

    #[test]
    fn test_parse_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.kdl");
        std::fs::write(
            &path,
            r#"
                device "/dev/input/event3"
                bindings {
                    bind "ctrl+shift+p" action="palette"
                }
            "#,
        )
        .unwrap();

        let result = parse_config(&path).unwrap();
        assert_eq!(
            result.device.as_deref(),
            Some(std::path::Path::new("/dev/input/event3"))
        );
        assert_eq!(result.bindings[0].action, "palette");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = parse_config(&dir.path().join("absent.kdl"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
