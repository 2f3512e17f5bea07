use {
    crate::error::{Result, RunnerError},
    clap::{crate_description, crate_version, App, Arg, ArgMatches},
    std::path::PathBuf,
};

/// Flags as given on the command line. `None` and empty lists leave the
/// config file value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub target: Option<String>,
    pub tv_dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
    pub filter: Option<String>,
    pub log_level: Option<String>,
    pub packet_timeout_ms: Option<u64>,
}

pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("tvrunner")
        .about(crate_description!())
        .version(crate_version!())
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .help("YAML configuration file"),
        )
        .arg(
            Arg::with_name("target")
                .short("t")
                .long("target")
                .value_name("ADDR")
                .takes_value(true)
                .help("P4Runtime server address, host:port or a full URI [default: 127.0.0.1:9559]"),
        )
        .arg(
            Arg::with_name("tv_dir")
                .long("tv-dir")
                .value_name("DIR")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Run every test vector file in DIR"),
        )
        .arg(
            Arg::with_name("match")
                .short("m")
                .long("match")
                .value_name("ID")
                .takes_value(true)
                .help("Only run test cases whose id contains ID"),
        )
        .arg(
            Arg::with_name("log_level")
                .long("log-level")
                .value_name("FILTER")
                .takes_value(true)
                .help("Log filter, e.g. debug or tvr_p4rt=debug,info [default: info]"),
        )
        .arg(
            Arg::with_name("packet_timeout_ms")
                .long("packet-timeout-ms")
                .value_name("MILLISECONDS")
                .takes_value(true)
                .validator(|value| {
                    value
                        .parse::<u64>()
                        .map(|_| ())
                        .map_err(|e| format!("invalid timeout {value:?}: {e}"))
                })
                .help("How long to wait for an expected packet-in [default: 3000]"),
        )
        .arg(
            Arg::with_name("files")
                .index(1)
                .value_name("FILE")
                .multiple(true)
                .help("Test vector files (.json, .yaml, .yml)"),
        )
}

pub fn parse_args(matches: &ArgMatches<'_>) -> Result<CliArgs> {
    let paths = |name: &str| -> Vec<PathBuf> {
        matches
            .values_of(name)
            .map(|values| values.map(PathBuf::from).collect())
            .unwrap_or_default()
    };
    let packet_timeout_ms = matches
        .value_of("packet_timeout_ms")
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|e| RunnerError::Argument(format!("--packet-timeout-ms {value}: {e}")))
        })
        .transpose()?;

    Ok(CliArgs {
        config: matches.value_of("config").map(PathBuf::from),
        target: matches.value_of("target").map(str::to_string),
        tv_dirs: paths("tv_dir"),
        files: paths("files"),
        filter: matches.value_of("match").map(str::to_string),
        log_level: matches.value_of("log_level").map(str::to_string),
        packet_timeout_ms,
    })
}

#[cfg(test)]
mod tests {
    use {super::*, test_case::test_case};

    fn parse(args: &[&str]) -> CliArgs {
        let matches = app().get_matches_from_safe(args).unwrap();
        parse_args(&matches).unwrap()
    }

    #[test]
    fn test_no_flags() {
        assert_eq!(parse(&["tvrunner"]), CliArgs::default());
    }

    #[test]
    fn test_all_flags() {
        let args = parse(&[
            "tvrunner",
            "--config",
            "runner.yaml",
            "--target",
            "switch:9559",
            "--tv-dir",
            "tvs/p4rt",
            "--tv-dir",
            "tvs/l3",
            "--match",
            "route",
            "--log-level",
            "debug",
            "--packet-timeout-ms",
            "250",
            "a.yaml",
            "b.json",
        ]);
        assert_eq!(
            args,
            CliArgs {
                config: Some(PathBuf::from("runner.yaml")),
                target: Some("switch:9559".to_string()),
                tv_dirs: vec![PathBuf::from("tvs/p4rt"), PathBuf::from("tvs/l3")],
                files: vec![PathBuf::from("a.yaml"), PathBuf::from("b.json")],
                filter: Some("route".to_string()),
                log_level: Some("debug".to_string()),
                packet_timeout_ms: Some(250),
            }
        );
    }

    #[test_case("soon"; "not a number")]
    #[test_case("-1"; "negative")]
    fn test_bad_timeout_rejected(value: &str) {
        let result = app().get_matches_from_safe(["tvrunner", "--packet-timeout-ms", value]);
        assert!(result.is_err());
    }
}
