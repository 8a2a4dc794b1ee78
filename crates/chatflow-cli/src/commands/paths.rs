use anyhow::Result;
use chatflow_infrastructure::paths;
use chatflow_transport::TransportConfig;

pub fn run() -> Result<()> {
    println!("data dir:    {}", paths::data_dir()?.display());
    println!("config dir:  {}", paths::config_dir()?.display());
    if let Some(config) = TransportConfig::config_path() {
        let status = if config.exists() { "present" } else { "absent" };
        println!("config file: {} ({status})", config.display());
    }
    Ok(())
}
