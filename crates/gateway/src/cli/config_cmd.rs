//! `config {show,validate}` subcommand.

use sa_domain::config::Config;

pub fn show(config: &Config) -> anyhow::Result<()> {
    let text = toml::to_string_pretty(config)?;
    println!("{text}");
    Ok(())
}

pub fn validate(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    if issues.is_empty() {
        println!("no issues found");
        return Ok(());
    }
    for issue in &issues {
        println!("{issue}");
    }
    if issues
        .iter()
        .any(|i| i.severity == sa_domain::config::ConfigSeverity::Error)
    {
        std::process::exit(1);
    }
    Ok(())
}
