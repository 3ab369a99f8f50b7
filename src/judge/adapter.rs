use std::path::Path;

/// Toolchain adapter contract for compile/syntax/run commands.
pub trait JudgeAdapter: Send + Sync {
    /// Compiler executable, used for diagnostics
    fn compiler(&self) -> &str;
    fn compile_command(&self, source: &Path, output: &Path) -> Vec<String>;
    fn syntax_command(&self, source: &Path) -> Vec<String>;
    fn run_command(&self, binary: &Path) -> Vec<String>;
    fn version_command(&self) -> Vec<String>;
}
