//! Build script for tmedia-native
//!
//! Handles:
//! 1. Locating FFmpeg and libass
//! 2. Compiling the C accessor library via `cc`
//! 3. Linking FFmpeg (static when archives are present), libass and the
//!    Android system libraries

use std::env;
use std::path::{Path, PathBuf};

fn main() {
  let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

  let ffmpeg_dir = find_prefix("FFMPEG_DIR", "libavcodec", "include/libavcodec/avcodec.h");
  let libass_dir = find_prefix("LIBASS_DIR", "libass", "include/ass/ass.h");

  compile_accessors(&ffmpeg_dir);

  link_ffmpeg(&ffmpeg_dir, &target_os);
  link_libass(&libass_dir);
  link_platform_libraries(&target_os);

  println!("cargo:rerun-if-changed=src/ffi/accessors.c");
  println!("cargo:rerun-if-changed=build.rs");
  println!("cargo:rerun-if-env-changed=FFMPEG_DIR");
  println!("cargo:rerun-if-env-changed=LIBASS_DIR");
}

/// Installation prefix of a library: `env_var`, then pkg-config, then common paths
fn find_prefix(env_var: &str, pkg_name: &str, probe: &str) -> PathBuf {
  if let Ok(dir) = env::var(env_var) {
    return PathBuf::from(dir);
  }

  #[cfg(unix)]
  {
    if let Ok(output) = std::process::Command::new("pkg-config")
      .args(["--variable=prefix", pkg_name])
      .output()
    {
      if output.status.success() {
        let prefix = String::from_utf8_lossy(&output.stdout);
        let path = PathBuf::from(prefix.trim());
        if path.exists() {
          return path;
        }
      }
    }
  }

  for path in ["/usr", "/usr/local", "/opt/homebrew", "/opt/ffmpeg"] {
    let p = PathBuf::from(path);
    if p.join(probe).exists() {
      return p;
    }
  }

  println!(
    "cargo:warning={} not found. Set {} or install it where pkg-config can see it.",
    pkg_name, env_var
  );
  PathBuf::from("/usr/local")
}

/// Compile the C accessor library
fn compile_accessors(ffmpeg_dir: &Path) {
  let mut build = cc::Build::new();
  build
    .file("src/ffi/accessors.c")
    .include(ffmpeg_dir.join("include"))
    .warnings(true)
    .extra_warnings(true);

  // Some accessors read fields newer FFmpeg marks deprecated
  build.flag_if_supported("-Wno-deprecated-declarations");

  build.compile("ffmpeg_accessors");
}

/// Link a library from `lib_dir`, preferring its static archive
fn link_library(lib_dir: &Path, name: &str) {
  let static_lib = lib_dir.join(format!("lib{}.a", name));
  let kind = if static_lib.exists() { "static" } else { "dylib" };
  println!("cargo:rustc-link-search=native={}", lib_dir.display());
  println!("cargo:rustc-link-lib={}={}", kind, name);
}

/// Link FFmpeg; order matters for static archives
fn link_ffmpeg(ffmpeg_dir: &Path, target_os: &str) {
  let lib_dir = ffmpeg_dir.join("lib");
  for lib in ["avformat", "avcodec", "swscale", "swresample", "avutil"] {
    link_library(&lib_dir, lib);
  }

  // Static FFmpeg builds for desktop usually pull these in
  if target_os != "android" && lib_dir.join("libavcodec.a").exists() {
    for lib in ["dav1d", "vpx", "opus", "mp3lame"] {
      if lib_dir.join(format!("lib{}.a", lib)).exists() {
        println!("cargo:rustc-link-lib=static={}", lib);
      }
    }
  }
}

/// Link libass and the libraries a static libass depends on
fn link_libass(libass_dir: &Path) {
  let lib_dir = libass_dir.join("lib");
  link_library(&lib_dir, "ass");

  if lib_dir.join("libass.a").exists() {
    for lib in ["harfbuzz", "fribidi", "freetype", "unibreak", "fontconfig"] {
      if lib_dir.join(format!("lib{}.a", lib)).exists() {
        println!("cargo:rustc-link-lib=static={}", lib);
      }
    }
  }
}

/// Link platform-specific system libraries
fn link_platform_libraries(target_os: &str) {
  match target_os {
    "android" => {
      for lib in ["OpenSLES", "log", "android", "mediandk", "z", "m"] {
        println!("cargo:rustc-link-lib={}", lib);
      }
    }

    "linux" => {
      println!("cargo:rustc-link-lib=z");
      println!("cargo:rustc-link-lib=m");
      println!("cargo:rustc-link-lib=pthread");
      println!("cargo:rustc-link-lib=dl");
    }

    "macos" => {
      for framework in ["CoreFoundation", "CoreText", "CoreServices", "Security"] {
        println!("cargo:rustc-link-lib=framework={}", framework);
      }
      println!("cargo:rustc-link-lib=z");
      println!("cargo:rustc-link-lib=iconv");
    }

    _ => {
      println!("cargo:warning=Unknown target OS: {}", target_os);
    }
  }
}
