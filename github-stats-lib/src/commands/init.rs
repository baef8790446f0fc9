use super::Host;
use super::config::{Config, DEFAULT_CONFIG_FILE};
use crate::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output configuration file path
    #[arg(value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub output: Utf8PathBuf,
}

pub fn init_config<H: Host>(host: &mut H, args: &InitArgs) -> Result<()> {
    Config::save_default(&args.output)?;
    let _ = writeln!(host.output(), "Generated default configuration file: {}", args.output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_init_writes_loadable_config() {
        let tmp = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let output = base.join(DEFAULT_CONFIG_FILE);

        let mut host = TestHost::new();
        init_config(&mut host, &InitArgs { output }).unwrap();

        assert!(host.output_str().contains("Generated default configuration file"));
        assert_eq!(Config::load(&base, None).unwrap(), Config::default());
    }

    #[test]
    fn test_default_output_path() {
        let args = InitArgs::try_parse_from(["init"]).unwrap();
        assert_eq!(args.output, DEFAULT_CONFIG_FILE);
    }
}
