use anyhow::Result;
use clap::Args;
use console::style;

use crate::weave::registry::LANGUAGE_EXTENSIONS;

#[derive(Args, Debug, Default)]
pub struct LanguagesArgs {
    /// Print only the identifiers, one per line
    #[arg(long)]
    pub names_only: bool,
}

pub fn execute(args: LanguagesArgs) -> Result<()> {
    for (language, extensions) in LANGUAGE_EXTENSIONS.iter() {
        if args.names_only {
            println!("{language}");
        } else {
            println!("  {:<12} {}", style(language).cyan(), extensions.join(" "));
        }
    }
    Ok(())
}
