use serialpkt_packet::{DEFAULT_TIMEOUT, MAX_PAYLOAD};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("serialpkt {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: serialpkt");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("max_payload: {MAX_PAYLOAD}");
    println!("default_timeout_ms: {}", DEFAULT_TIMEOUT.as_millis());
    println!(
        "features: serde={}, cli=true",
        cfg!(feature = "serde")
    );
    println!("log_env: {}", crate::logging::LOG_ENV);

    Ok(SUCCESS)
}
