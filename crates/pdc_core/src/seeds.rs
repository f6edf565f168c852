//! Reference data every fresh catalog starts with.
//! Must stay in sync with the INSERT in `pdc_postgres/migrations/0001_catalog.sql`.

pub const ARCHES: &[&str] = &[
    "aarch64", "i386", "i686", "ia64", "noarch", "ppc", "ppc64", "ppc64le", "s390", "s390x", "src",
    "x86_64",
];
