//! Stand-in ffprobe/ffmpeg executables for tests
//!
//! The fake ffprobe reports one audio stream whose language is read from a
//! `<file>.lang` sidecar. The fake ffmpeg copies its input to its output and
//! writes the requested language into the input's sidecar, so a rewrite can
//! be read back through the fake ffprobe.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Write an executable `sh` script named `name` into `dir` and return its path
pub fn write_script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

pub fn fake_ffprobe(dir: &Path) -> String {
    write_script(
        dir,
        "ffprobe",
        r#"for last; do :; done
if [ -f "$last.lang" ]; then
  lang=$(cat "$last.lang")
  printf '{"streams":[{"index":0,"codec_type":"video"},{"index":1,"codec_type":"audio","tags":{"language":"%s"}}]}' "$lang"
else
  printf '{"streams":[{"index":0,"codec_type":"video"},{"index":1,"codec_type":"audio"}]}'
fi"#,
    )
}

pub fn fake_ffmpeg(dir: &Path) -> String {
    write_script(
        dir,
        "ffmpeg",
        r#"src=""
lang=""
while [ $# -gt 1 ]; do
  case "$1" in
    -i) src="$2" ;;
    language=*) lang="${1#language=}" ;;
  esac
  shift
done
cp "$src" "$1" && printf '%s' "$lang" > "$src.lang""#,
    )
}

/// A tool that prints `stderr` and exits non-zero
pub fn failing_tool(dir: &Path, name: &str, stderr: &str) -> String {
    write_script(dir, name, &format!("echo '{stderr}' >&2\nexit 1"))
}
