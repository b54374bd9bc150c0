use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("plugwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: plugwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "target: {}",
        option_env!("PLUGWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("PLUGWIRE_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "features: session={}, host={}, cli=true",
        cfg!(feature = "session"),
        cfg!(feature = "host")
    );
    println!("wire: json-array, ids: host<0 plugin>0");

    Ok(SUCCESS)
}
