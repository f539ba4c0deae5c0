use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("sitescout")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Sitescout Contributors")
        .about("Explore article sites and generate validated extraction selectors")
        .arg(clap::arg!(<URL>... "Site URLs to process (directories with --local)"))
        .arg(clap::arg!(--local "Treat each argument as a directory of saved HTML pages"))
        .arg(
            clap::arg!(-o --output <DIR> "Directory for generated selector reports")
                .value_name("DIR")
                .default_value("scrapers")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--max_iterations <NUM> "Maximum exploration iterations per site").default_value("15"))
        .arg(clap::arg!(--max_articles <NUM> "Stop exploring once this many article URLs are known").default_value("30"))
        .arg(clap::arg!(--max_retries <NUM> "Selector revisions after the initial proposal").default_value("2"))
        .arg(clap::arg!(--samples <NUM> "Article pages sampled for validation").default_value("5"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("15"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
        .arg(clap::arg!(--model <MODEL> "Model identifier").env("SITESCOUT_MODEL"))
        .arg(clap::arg!(--api_url <URL> "Chat-completions endpoint").env("SITESCOUT_API_URL"))
        .arg(
            clap::arg!(--api_key <KEY> "API key for the model endpoint")
                .env("OPENROUTER_API_KEY")
                .hide_env_values(true),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "sitescout", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "sitescout", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "sitescout", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "sitescout", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
