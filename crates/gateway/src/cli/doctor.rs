//! `doctor` subcommand: sanity-check configuration, store connectivity, and
//! provider registration without starting the supervisor. Ported from
//! `main.py`'s startup preflight checks, surfaced as an explicit command
//! instead of running implicitly on every `serve`.

use sa_domain::config::Config;
use sa_providers::ProviderRegistry;
use sa_store::Store;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let mut ok = true;

    let issues = config.validate();
    if issues.is_empty() {
        println!("config: OK");
    } else {
        ok = false;
        println!("config: {} issue(s)", issues.len());
        for issue in &issues {
            println!("  - {issue}");
        }
    }

    match Store::new(&config.paths.db) {
        Ok(_) => println!("store: OK ({})", config.paths.db.display()),
        Err(e) => {
            ok = false;
            println!("store: FAILED ({e})");
        }
    }

    let providers = ProviderRegistry::from_config(&config.llm);
    if providers.is_empty() {
        ok = false;
        println!("providers: none registered");
    } else {
        println!("providers: {}", providers.list_providers().join(", "));
    }
    for err in providers.init_errors() {
        ok = false;
        println!("  - provider '{}' init error: {}", err.provider_id, err.error);
    }

    if ok {
        println!("doctor: all checks passed");
        Ok(())
    } else {
        println!("doctor: checks failed");
        std::process::exit(1);
    }
}
