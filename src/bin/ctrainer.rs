use anyhow::Result;

fn main() -> Result<()> {
    ctrainer::cli::run()
}
