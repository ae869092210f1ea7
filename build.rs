use std::error::Error;
use std::fmt::Write as _;
use std::{ fs, path::Path, path::PathBuf };
use serde_json::Value;
use anyhow::Result;

fn main() -> Result<(), Box<dyn Error>> {
    let locales_dir = Path::new(&std::env::var("CARGO_MANIFEST_DIR")?).join("locales");
    let out_path = Path::new(&std::env::var("OUT_DIR")?).join("resource_manifest.rs");

    println!("cargo:rerun-if-changed=locales");

    // Always create the file, even if empty, so include! works
    if !locales_dir.exists() {
        println!("cargo:warning=No locales/ folder found, resource registry will be empty");
        fs::write(out_path, render_manifest(&[]))?;
        return Ok(());
    }

    let entries = collect_resources(&locales_dir)?;
    fs::write(out_path, render_manifest(&entries))?;
    Ok(())
}

/// One `{locale}/{namespace}.json` file found under `locales/`.
struct ResourceFile {
    locale: String,
    namespace: String,
    path: PathBuf,
}

fn collect_resources(locales_dir: &Path) -> Result<Vec<ResourceFile>> {
    let mut entries = Vec::new();

    for lang_entry in fs::read_dir(locales_dir)? {
        let lang_dir = lang_entry?;
        if !lang_dir.file_type()?.is_dir() {
            continue;
        }

        let locale = lang_dir.file_name().to_string_lossy().to_string();

        for file_entry in fs::read_dir(lang_dir.path())? {
            let file_path = file_entry?.path();

            if let Some("json") = file_path.extension().and_then(|e| e.to_str()) {
                let Some(namespace) = file_path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };

                // Catch broken bundles at build time rather than on first load
                let content = fs::read_to_string(&file_path)?;
                let json: Value = serde_json::from_str(&content)
                    .map_err(|e| anyhow::anyhow!("{}: {}", file_path.display(), e))?;
                if !json.is_object() {
                    anyhow::bail!("{}: top level must be an object", file_path.display());
                }

                entries.push(ResourceFile {
                    locale: locale.clone(),
                    namespace: namespace.to_string(),
                    path: file_path.canonicalize()?,
                });
            }
        }
    }

    entries.sort_by(|a, b| (&a.locale, &a.namespace).cmp(&(&b.locale, &b.namespace)));
    Ok(entries)
}

fn render_manifest(entries: &[ResourceFile]) -> String {
    let mut out = String::from(
        "/// `(locale, namespace, json)` for every file under `locales/`, generated by build.rs.\n"
    );
    out.push_str("pub(crate) static EMBEDDED_RESOURCES: &[(&str, &str, &str)] = &[\n");
    for entry in entries {
        let _ = writeln!(
            out,
            "    ({:?}, {:?}, include_str!({:?})),",
            entry.locale,
            entry.namespace,
            entry.path.display().to_string()
        );
    }
    out.push_str("];\n");
    out
}
