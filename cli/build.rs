//! Embeds the git commit and build date into the binary for the `version`
//! subcommand (§6). `idempotent()` falls back to placeholder values instead
//! of failing the build when the source tree has no `.git` (e.g. a tarball
//! checkout), matching how release packaging for this crate is expected to
//! work.

fn main() {
    if let Err(e) = vergen::EmitBuilder::builder()
        .idempotent()
        .build_timestamp()
        .git_sha(true)
        .emit()
    {
        println!("cargo:warning=failed to embed build metadata: {e}");
    }
}
