use crate::judge::adapter::JudgeAdapter;
use std::path::Path;

const WARNING_FLAGS: [&str; 2] = ["-Wall", "-Wextra"];

/// C11 through gcc (or any gcc-compatible driver)
#[derive(Debug, Clone)]
pub struct GccAdapter {
    compiler: String,
}

impl GccAdapter {
    pub fn new(compiler: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
        }
    }
}

impl Default for GccAdapter {
    fn default() -> Self {
        Self::new("gcc")
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl JudgeAdapter for GccAdapter {
    fn compiler(&self) -> &str {
        &self.compiler
    }

    fn compile_command(&self, source: &Path, output: &Path) -> Vec<String> {
        let mut cmd = vec![self.compiler.clone()];
        cmd.extend(WARNING_FLAGS.iter().map(|f| f.to_string()));
        cmd.push("-std=c11".to_string());
        cmd.push("-o".to_string());
        cmd.push(path_arg(output));
        cmd.push(path_arg(source));
        cmd
    }

    fn syntax_command(&self, source: &Path) -> Vec<String> {
        let mut cmd = vec![self.compiler.clone(), "-fsyntax-only".to_string()];
        cmd.extend(WARNING_FLAGS.iter().map(|f| f.to_string()));
        cmd.push(path_arg(source));
        cmd
    }

    fn run_command(&self, binary: &Path) -> Vec<String> {
        vec![path_arg(binary)]
    }

    fn version_command(&self) -> Vec<String> {
        vec![self.compiler.clone(), "--version".to_string()]
    }
}
