// src/version/arch.rs

//! Architecture names recognized in version strings and package names

use std::env;

/// Architectures the package manager knows about
pub const KNOWN_ARCHES: &[&str] = &[
    "aarch64", "alpha", "alphaev4", "alphaev45", "alphaev5", "alphaev56", "alphaev6",
    "alphaev67", "alphaev68", "alphaev7", "alphapca56", "armv5tejl", "armv5tel", "armv5tl",
    "armv6l", "armv7l", "armv8l", "armv6hl", "armv7hl", "armv7hnl", "armv8hl", "athlon",
    "geode", "i386", "i486", "i586", "i686", "ia64", "mips", "mipsel", "mips64", "mips64el",
    "noarch", "ppc", "ppc64", "ppc64iseries", "ppc64p7", "ppc64pseries", "ppc64le", "riscv32",
    "riscv64", "riscv128", "s390", "s390x", "sh3", "sh4", "sh4a", "sparc", "sparc64",
    "sparc64v", "sparcv8", "sparcv9", "sparcv9v", "x86_64", "amd64", "ia32e",
];

pub fn is_known_arch(arch: &str) -> bool {
    KNOWN_ARCHES.contains(&arch)
}

/// Split a trailing `.arch` suffix off a version string or package name
///
/// Returns the remainder and the architecture when the text after the last
/// dot is a recognized architecture; otherwise the input is returned whole.
pub fn split_arch(s: &str) -> (&str, Option<&str>) {
    match s.rsplit_once('.') {
        Some((rest, arch)) if !rest.is_empty() && is_known_arch(arch) => (rest, Some(arch)),
        _ => (s, None),
    }
}

/// Detect the native package architecture of this machine
pub fn native_arch() -> String {
    // env::consts::ARCH uses Rust target names, not RPM ones
    match env::consts::ARCH {
        "x86" => "i686".to_string(),
        "arm" => "armv7hl".to_string(),
        "powerpc" => "ppc".to_string(),
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le".to_string(),
        "powerpc64" => "ppc64".to_string(),
        other => other.to_string(),
    }
}
