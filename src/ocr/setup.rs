use anyhow::{anyhow, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::log;
use crate::paths::get_tesseract_dir;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

/// Languages that can be fetched from the stock tessdata repository.
/// Custom models (such as a game font model) must be installed by hand.
const DOWNLOADABLE_LANGUAGES: &[&str] = &["eng", "jpn", "deu", "fra", "spa", "ita"];

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

const COMMON_INSTALL_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
    "/usr/share/tesseract-ocr/5",
    "/usr/share/tesseract-ocr/4.00",
    "/usr/local/share",
    "/opt/homebrew/share",
];

#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Ensures Tesseract and the trained data for `language` are available.
/// Downloads the trained data if it is a stock language and missing.
pub fn ensure_tesseract(language: &str) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;
    log(&format!("Tesseract executable: {}", executable.display()));

    if let Ok(tessdata) = find_tessdata_dir(language) {
        log(&format!("Tessdata for '{}' found at: {}", language, tessdata.display()));
        return Ok(TesseractPaths {
            executable,
            tessdata,
        });
    }

    let tessdata = get_tesseract_dir().join("tessdata");
    fs::create_dir_all(&tessdata)?;
    download_tessdata(&tessdata, language)?;

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Downloads `<language>.traineddata` into `tessdata_dir`.
fn download_tessdata(tessdata_dir: &Path, language: &str) -> Result<()> {
    if !DOWNLOADABLE_LANGUAGES.contains(&language) {
        return Err(anyhow!(
            "{}.traineddata not found. Copy it into {} or set TESSDATA_PREFIX",
            language,
            tessdata_dir.display()
        ));
    }

    let url = format!("{}/{}.traineddata", TESSDATA_REPO, language);
    let target = tessdata_dir.join(format!("{}.traineddata", language));

    log(&format!("Downloading {}.traineddata...", language));

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "uranium-companion")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}.traineddata: HTTP {}",
            language,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&target)?;
    file.write_all(&bytes)?;

    log(&format!(
        "Downloaded {}.traineddata ({} bytes)",
        language,
        bytes.len()
    ));

    Ok(())
}

/// Finds the Tesseract executable, checking our local dir first, then PATH,
/// then common install locations.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let local_exe = get_tesseract_dir().join(EXECUTABLE_NAME);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for dir in COMMON_INSTALL_DIRS {
        let p = PathBuf::from(dir).join(EXECUTABLE_NAME);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR and add it to PATH, or copy it to {}",
        get_tesseract_dir().display()
    ))
}

/// Finds a tessdata directory containing `<language>.traineddata`.
pub fn find_tessdata_dir(language: &str) -> Result<PathBuf> {
    let candidates = tessdata_candidates();
    find_traineddata_in(&candidates, language).ok_or_else(|| {
        anyhow!(
            "tessdata directory with {}.traineddata not found",
            language
        )
    })
}

fn tessdata_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![get_tesseract_dir().join("tessdata")];

    // TESSDATA_PREFIX may point at tessdata itself or at its parent
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    candidates.extend(
        COMMON_INSTALL_DIRS
            .iter()
            .map(|dir| PathBuf::from(dir).join("tessdata")),
    );
    candidates
}

fn find_traineddata_in(candidates: &[PathBuf], language: &str) -> Option<PathBuf> {
    let file_name = format!("{}.traineddata", language);
    candidates
        .iter()
        .find(|dir| dir.join(&file_name).exists())
        .cloned()
}
