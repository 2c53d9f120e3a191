//! Profile resume rendering.
//!
//! A resume is produced in three steps: the profile picture is loaded (the
//! only step allowed to degrade to placeholder text), the profile is resolved
//! into a [`layout::ProfileDocument`], and the document is painted to PDF and
//! written into the uploads directory. [`render_profile`] returns only once the
//! file is durable on disk.

pub mod layout;
pub mod metrics;
pub mod pdf;
pub mod picture;

use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio::io::AsyncWriteExt;

use crate::errors::ApiError;
use crate::models::profile::Profile;
use crate::models::user::PublicUser;
use crate::utils::random_hex;
use layout::ProfileDocument;
use picture::Picture;

const HANDLE_HEX_LEN: usize = 64;

/// Renders `profile` (and its owner, when known) into a fresh PDF in
/// `uploads_dir` and returns the file's base name.
pub async fn render_profile(
    profile: &Profile,
    user: Option<&PublicUser>,
    uploads_dir: &Path,
    timeout: Duration,
) -> Result<String, ApiError> {
    tokio::fs::create_dir_all(uploads_dir).await?;
    let file_name = format!("{}.pdf", random_hex(HANDLE_HEX_LEN / 2));
    let path = uploads_dir.join(&file_name);

    let picture = Picture::load(uploads_dir, user.map(|u| u.profile_picture.as_str()).unwrap_or("")).await;
    let doc = ProfileDocument::build(profile, user, picture);
    let painted = tokio::task::spawn_blocking(move || pdf::paint(&doc))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("render task failed: {e}")))??;

    let written = match tokio::time::timeout(timeout, write_durably(&path, &painted.bytes)).await {
        Ok(res) => res,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "timed out writing rendered document")),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&path).await;
        return Err(e.into());
    }

    log::info!(
        "rendered profile {} into {} ({} bytes, {} pages)",
        profile.id,
        file_name,
        painted.bytes.len(),
        painted.pages
    );
    Ok(file_name)
}

/// Creates `path`, writes `bytes` and waits until they are flushed and synced.
async fn write_durably(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

/// Whether `name` has the shape of a rendered document handle.
pub fn is_rendered_name(name: &str) -> bool {
    match name.strip_suffix(".pdf") {
        Some(stem) => {
            stem.len() == HANDLE_HEX_LEN && stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        }
        None => false,
    }
}

/// Deletes rendered documents in `dir` whose age is at least `max_age`.
/// Other files are never touched. Returns how many were removed.
pub async fn sweep_expired(dir: &Path, max_age: Duration) -> io::Result<usize> {
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;
    let now = SystemTime::now();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !is_rendered_name(name) {
            continue;
        }
        match remove_if_expired(&entry.path(), now, max_age).await {
            Ok(true) => removed += 1,
            Ok(false) => {}
            // gone already, e.g. swept by a concurrent pass
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("could not sweep {name}: {e}"),
        }
    }
    Ok(removed)
}

async fn remove_if_expired(path: &Path, now: SystemTime, max_age: Duration) -> io::Result<bool> {
    let meta = tokio::fs::symlink_metadata(path).await?;
    if !meta.is_file() {
        return Ok(false);
    }
    let age = meta
        .modified()
        .ok()
        .and_then(|m| now.duration_since(m).ok())
        .unwrap_or_default();
    if age < max_age {
        return Ok(false);
    }
    tokio::fs::remove_file(path).await?;
    Ok(true)
}
