//! `bentofolio init`: First-time setup.

use bentofolio_config::AppConfig;
use std::path::Path;

pub async fn run(path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = super::config_file(path);

    println!("Bentofolio setup");
    println!("================\n");

    if config_path.exists() && !force {
        println!("  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or re-run with --force.\n");
    } else {
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created {}", config_path.display());
    }

    let config = super::load_config(path)?;
    for dir in [&config.storage.data_dir, &config.storage.assets_dir] {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("  Created {}", dir.display());
        }
    }

    println!("\n  Next steps:");
    println!("   1. Set BENTOFOLIO_API_KEY or GITHUB_TOKEN (or api_key in the config)");
    println!("   2. Run: bentofolio chat");
    println!("   3. Run: bentofolio serve to open the editor API\n");

    Ok(())
}
