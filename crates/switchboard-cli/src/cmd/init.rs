use anyhow::Context;
use std::path::Path;
use switchboard_core::config::Config;
use switchboard_core::{io, paths};

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing switchboard in: {}", root.display());

    let dir = paths::switchboard_dir(root);
    std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let yaml = starter_yaml()?;
    let created = io::write_if_missing(&paths::config_path(root), yaml.as_bytes())
        .context("failed to write config.yaml")?;
    if created {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    println!("\nNext: switchboard actions enable ping && switchboard actions trigger ping");
    Ok(())
}

fn starter_yaml() -> anyhow::Result<String> {
    let mut yaml = String::from(
        "# switchboard configuration\n\
         # Each action maps a cataloged name to the command it runs.\n",
    );
    yaml.push_str(&Config::starter().to_yaml()?);
    Ok(yaml)
}
