use tokenward::settings::*;

fn main() -> anyhow::Result<()> {
    // $ cargo run --bin settings_demo -- --settings=settings/dev.toml
    // $ TOKENWARD__AUTHORITY__TOKEN_STYLE=ulid cargo run --bin settings_demo
    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref())?;
    println!("Loaded settings: {:#?}", project_settings);

    let authority = &project_settings.authority;
    println!(
        "store={:?} style={:?} timeout={}s header={}",
        authority.store_type, authority.token_style, authority.timeout_secs, authority.token_name
    );

    let is_err = parse_settings(Some("")).is_err();
    println!("Error on invalid path: {:?}", is_err);

    Ok(())
}
