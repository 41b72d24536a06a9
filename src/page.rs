use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};

use crate::schema::{Page, PageLayout};

pub fn load_and_validate_page(path: &Path) -> Result<Page> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read page {}", path.display()))?;
    let mut page: Page = serde_yaml::from_str(&contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        anyhow!(
            "failed to parse yaml in {} at {}: {}",
            path.display(),
            location,
            error
        )
    })?;

    validate_page(&mut page, path)?;
    Ok(page)
}

fn validate_page(page: &mut Page, page_path: &Path) -> Result<()> {
    page.validate()
        .with_context(|| format!("invalid page {}", page_path.display()))?;

    let page_dir = page_path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    match &mut page.layout {
        PageLayout::Glitch(layout) => {
            layout.base_image =
                resolve_and_validate_asset_path(&page_dir, &layout.base_image, "base_image")?;
        }
        PageLayout::Anchored(layout) => {
            for (index, image) in layout.images.iter_mut().enumerate() {
                image.path = resolve_and_validate_asset_path(
                    &page_dir,
                    &image.path,
                    &format!("images[{index}].path"),
                )?;
            }
        }
    }

    Ok(())
}

fn resolve_and_validate_asset_path(
    page_dir: &Path,
    source_path: &Path,
    field_name: &str,
) -> Result<PathBuf> {
    let resolved = if source_path.is_absolute() {
        source_path.to_path_buf()
    } else {
        page_dir.join(source_path)
    };

    if !resolved.exists() {
        bail!("{} does not exist: {}", field_name, resolved.display());
    }

    if !resolved.is_file() {
        bail!("{} is not a file: {}", field_name, resolved.display());
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_assets_relative_to_page() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.png"), b"not decoded here").unwrap();
        let page_path = dir.path().join("page.yaml");
        fs::write(
            &page_path,
            "viewport: { width: 800 }\nlayout:\n  glitch:\n    base_image: base.png\n",
        )
        .unwrap();

        let page = load_and_validate_page(&page_path).unwrap();
        let PageLayout::Glitch(layout) = &page.layout else {
            panic!("expected glitch layout");
        };
        assert_eq!(layout.base_image, dir.path().join("base.png"));
    }

    #[test]
    fn reports_missing_asset() {
        let dir = tempfile::tempdir().unwrap();
        let page_path = dir.path().join("page.yaml");
        fs::write(
            &page_path,
            "viewport: { width: 800 }\nlayout:\n  anchored:\n    images:\n      - { path: gone.png }\n",
        )
        .unwrap();

        let err = load_and_validate_page(&page_path).unwrap_err();
        assert!(err.to_string().contains("images[0].path does not exist"));
    }

    #[test]
    fn reports_yaml_location() {
        let dir = tempfile::tempdir().unwrap();
        let page_path = dir.path().join("page.yaml");
        fs::write(&page_path, "viewport: { width: 800 }\nlayout: [\n").unwrap();

        let err = load_and_validate_page(&page_path).unwrap_err();
        assert!(err.to_string().contains("failed to parse yaml"));
        assert!(err.to_string().contains("line"));
    }
}
