//! `CompilerConfig`: the two runtime knobs the ambient stack calls for
//! (§0 "Configuration"), grounded in the teacher's own `config.rs`
//! pattern of a small `Default`-able struct threaded explicitly through
//! the pipeline entry point rather than read from globals.
//!
//! The recognised type-name table (`int32`/`float64`/`boolean`/`object`/
//! `void`/`any`) is deliberately **not** one of these knobs: it's a fixed
//! part of the type lattice (`StaticType::from_annotation`), matching the
//! original engine's own fixed `TypeName` enum, and making it configurable
//! here would let a test silently diverge from what the parser itself
//! recognises. Only genuinely independent behaviour gets a field.
//!
//! [`CompilerConfig`] is also loadable from an on-disk TOML file (the
//! `jac.toml` a host project would check in), following the
//! `serde`-`Deserialize`-then-`TryFrom` shape used for config structs
//! elsewhere in the pack (e.g. a dashboard's gauge-layout config):
//! the wire format is a plain, serde-derived struct (`OnDiskConfig`),
//! kept separate from [`CompilerConfig`] itself so the in-memory type's
//! `BackendMode` enum doesn't need to grow `serde` derives just to be
//! constructible from code.

use std::path::Path;

/// Which concrete backend [`crate::host::evaluate`] drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendMode {
    /// Shell out through [`crate::lower::lower_module`] and produce
    /// textual LLVM IR, exactly as production use would.
    #[default]
    NativeLlvmIr,
    /// Skip native lowering entirely and return a human-readable
    /// description of each function's simplified CFG instead — for tests
    /// that want to assert on CFG shape without a backend in the loop.
    DescribeOnly,
}

impl BackendMode {
    fn from_wire(name: &str) -> Result<Self, ConfigError> {
        match name {
            "native-llvm-ir" => Ok(BackendMode::NativeLlvmIr),
            "describe-only" => Ok(BackendMode::DescribeOnly),
            other => Err(ConfigError::UnknownBackendMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Runs [`crate::cfg::simplify::simplify`] on every emitted CFG.
    /// Disabling this is for tests that want to see the emitter's raw,
    /// unsimplified block structure (e.g. to assert an empty block really
    /// was produced before asserting the simplifier removes it).
    pub simplify_cfg: bool,
    pub backend_mode: BackendMode,
    /// Leaves the generated `.ll` file in the system temp directory
    /// instead of deleting it once `clang` has consumed it, mirroring
    /// the teacher's own `--keep-ir` flag.
    pub keep_generated_ir: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            simplify_cfg: true,
            backend_mode: BackendMode::NativeLlvmIr,
            keep_generated_ir: false,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn describe_only() -> Self {
        CompilerConfig { backend_mode: BackendMode::DescribeOnly, ..CompilerConfig::default() }
    }

    /// Loads a [`CompilerConfig`] from a TOML file on disk (the CLI's
    /// `--config` flag). Any field the file omits keeps its
    /// [`CompilerConfig::default`] value, matching a host project that
    /// only wants to override e.g. `keep_generated_ir` without restating
    /// the rest.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let on_disk: OnDiskConfig = toml::from_str(text).map_err(ConfigError::Parse)?;
        on_disk.try_into()
    }
}

/// The serde-facing wire format for [`CompilerConfig`]. All fields are
/// optional so a `jac.toml` only needs to mention what it overrides.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OnDiskConfig {
    pub simplify_cfg: Option<bool>,
    pub backend_mode: Option<String>,
    pub keep_generated_ir: Option<bool>,
}

impl TryFrom<OnDiskConfig> for CompilerConfig {
    type Error = ConfigError;

    fn try_from(on_disk: OnDiskConfig) -> Result<Self, ConfigError> {
        let default = CompilerConfig::default();
        let backend_mode = match on_disk.backend_mode {
            Some(name) => BackendMode::from_wire(&name)?,
            None => default.backend_mode,
        };
        Ok(CompilerConfig {
            simplify_cfg: on_disk.simplify_cfg.unwrap_or(default.simplify_cfg),
            backend_mode,
            keep_generated_ir: on_disk.keep_generated_ir.unwrap_or(default.keep_generated_ir),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(std::path::PathBuf, #[source] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    Parse(#[source] toml::de::Error),
    #[error("unknown backend_mode {0:?}, expected \"native-llvm-ir\" or \"describe-only\"")]
    UnknownBackendMode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_simplifies_and_targets_native_backend() {
        let cfg = CompilerConfig::new();
        assert!(cfg.simplify_cfg);
        assert_eq!(cfg.backend_mode, BackendMode::NativeLlvmIr);
        assert!(!cfg.keep_generated_ir);
    }

    #[test]
    fn describe_only_keeps_simplification_on() {
        let cfg = CompilerConfig::describe_only();
        assert!(cfg.simplify_cfg);
        assert_eq!(cfg.backend_mode, BackendMode::DescribeOnly);
    }

    #[test]
    fn an_empty_toml_file_yields_plain_defaults() {
        let cfg = CompilerConfig::from_toml_str("").unwrap();
        assert!(cfg.simplify_cfg);
        assert_eq!(cfg.backend_mode, BackendMode::NativeLlvmIr);
        assert!(!cfg.keep_generated_ir);
    }

    #[test]
    fn a_toml_file_overrides_only_the_fields_it_mentions() {
        let cfg = CompilerConfig::from_toml_str("keep_generated_ir = true\n").unwrap();
        assert!(cfg.simplify_cfg);
        assert!(cfg.keep_generated_ir);
    }

    #[test]
    fn backend_mode_is_parsed_from_its_wire_name() {
        let cfg = CompilerConfig::from_toml_str("backend_mode = \"describe-only\"\n").unwrap();
        assert_eq!(cfg.backend_mode, BackendMode::DescribeOnly);
    }

    #[test]
    fn an_unknown_backend_mode_name_is_rejected() {
        let err = CompilerConfig::from_toml_str("backend_mode = \"bogus\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBackendMode(name) if name == "bogus"));
    }

    #[test]
    fn an_unknown_field_is_rejected() {
        let err = CompilerConfig::from_toml_str("nonsense_field = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn a_missing_file_reports_io_error() {
        let err = CompilerConfig::from_file(Path::new("/nonexistent/jac.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }
}
