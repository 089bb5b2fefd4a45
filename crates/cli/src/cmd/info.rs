use anyhow::Result;
use serde::Serialize;

use natpack_lib::LoaderConfig;
use natpack_lib::extract::is_posix_compliant;
use natpack_platform::{Arch, Os};

use crate::output::{OutputFormat, print_json, print_stat, print_success, print_warning};

#[derive(Serialize)]
struct InfoOutput {
  arch: Option<Arch>,
  os: Option<Os>,
  triple: Option<String>,
  lib_extension: Option<&'static str>,
  temp_dir: String,
  cleanup: String,
  posix: bool,
  error: Option<String>,
}

pub fn cmd_info(output: OutputFormat) -> Result<()> {
  let config = LoaderConfig::from_env();
  let temp_dir = config.resolved_temp_dir();

  let arch = Arch::current();
  let os = Os::current();
  let triple = match (&arch, &os) {
    (Ok(arch), Ok(os)) => Some(natpack_platform::triple(*arch, *os)),
    _ => None,
  };
  let error = [arch.as_ref().err(), os.as_ref().err()]
    .into_iter()
    .flatten()
    .chain(triple.as_ref().and_then(|t| t.as_ref().err()))
    .map(ToString::to_string)
    .next();

  let info = InfoOutput {
    arch: arch.as_ref().ok().copied(),
    os: os.as_ref().ok().copied(),
    triple: triple.and_then(Result::ok),
    lib_extension: os.as_ref().ok().map(|os| os.lib_extension()),
    temp_dir: temp_dir.display().to_string(),
    cleanup: config.cleanup.to_string(),
    posix: is_posix_compliant(&temp_dir),
    error,
  };

  if output.is_json() {
    return print_json(&info);
  }

  match &info.triple {
    Some(triple) => print_success(&format!("Platform: {}", triple)),
    None => print_warning(&format!(
      "Could not detect platform: {}",
      info.error.as_deref().unwrap_or("unknown")
    )),
  }
  print_stat("Architecture", info.arch.map(|a| a.as_str()).unwrap_or("unknown"));
  print_stat("OS", info.os.map(|o| o.as_str()).unwrap_or("unknown"));
  print_stat("Extension", info.lib_extension.unwrap_or("unknown"));
  print_stat("Temp dir", &info.temp_dir);
  print_stat("Cleanup", &info.cleanup);
  print_stat("POSIX", if info.posix { "yes" } else { "no" });

  Ok(())
}
