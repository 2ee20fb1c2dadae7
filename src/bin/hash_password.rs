use clap::Parser;
use tokenward::application_impl::Argon2CredentialVerifier;

/// Prints an Argon2 PHC string for the `[credentials]` table.
#[derive(Parser, Debug)]
struct Args {
    password: String,
}

fn main() -> anyhow::Result<()> {
    // $ cargo run --bin hash_password -- 'correct horse'
    let args = Args::parse();
    println!("{}", Argon2CredentialVerifier::hash_password(&args.password)?);
    Ok(())
}
