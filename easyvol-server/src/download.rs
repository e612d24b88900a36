//! Secure file downloads
//!
//! Every stored file is addressed as `(kind, record id)` and resolved
//! through the database, never from a client-supplied path. The resolved
//! path must stay inside the uploads root; anything that escapes it is
//! refused before the filesystem is touched.

use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sqlx::PgPool;
use uuid::Uuid;

use easyvol_core::Module;

use crate::db::repos::DbError;
use crate::models::ValidationError;

/// The categories of stored files that can be downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    MemberAttachment,
    MemberPhoto,
    JuniorMemberAttachment,
    JuniorMemberPhoto,
    VehicleDocument,
    VehiclePhoto,
    MeetingAttachment,
    Document,
}

impl FromStr for FileKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member_attachment" => Ok(Self::MemberAttachment),
            "member_photo" => Ok(Self::MemberPhoto),
            "junior_member_attachment" => Ok(Self::JuniorMemberAttachment),
            "junior_member_photo" => Ok(Self::JuniorMemberPhoto),
            "vehicle_document" => Ok(Self::VehicleDocument),
            "vehicle_photo" => Ok(Self::VehiclePhoto),
            "meeting_attachment" => Ok(Self::MeetingAttachment),
            "document" => Ok(Self::Document),
            other => Err(ValidationError::InvalidVariant {
                field: "file kind",
                value: other.to_owned(),
            }),
        }
    }
}

impl FileKind {
    /// Which module's view grant is needed to fetch this file.
    pub fn module(&self) -> Module {
        match self {
            Self::MemberAttachment | Self::MemberPhoto => Module::Members,
            Self::JuniorMemberAttachment | Self::JuniorMemberPhoto => Module::JuniorMembers,
            Self::VehicleDocument | Self::VehiclePhoto => Module::Vehicles,
            Self::MeetingAttachment => Module::Meetings,
            Self::Document => Module::Documents,
        }
    }
}

/// A database-resolved file: relative path plus the name to suggest to
/// the browser.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub relative_path: String,
    pub suggested_name: String,
}

/// Look up the stored path for a file reference.
pub async fn resolve(pool: &PgPool, kind: FileKind, id: Uuid) -> Result<ResolvedFile, DbError> {
    let (query, resource): (&str, &'static str) = match kind {
        FileKind::MemberAttachment => (
            "SELECT file_path, title FROM member_attachments WHERE id = $1",
            "member attachment",
        ),
        FileKind::MemberPhoto => (
            "SELECT photo_path, last_name FROM members WHERE id = $1 AND photo_path IS NOT NULL",
            "member photo",
        ),
        FileKind::JuniorMemberAttachment => (
            "SELECT file_path, title FROM junior_member_attachments WHERE id = $1",
            "junior member attachment",
        ),
        FileKind::JuniorMemberPhoto => (
            "SELECT photo_path, last_name FROM junior_members WHERE id = $1 AND photo_path IS NOT NULL",
            "junior member photo",
        ),
        FileKind::VehicleDocument => (
            "SELECT file_path, title FROM vehicle_documents WHERE id = $1",
            "vehicle document",
        ),
        FileKind::VehiclePhoto => (
            "SELECT photo_path, code FROM vehicles WHERE id = $1 AND photo_path IS NOT NULL",
            "vehicle photo",
        ),
        FileKind::MeetingAttachment => (
            "SELECT file_path, title FROM meeting_attachments WHERE id = $1",
            "meeting attachment",
        ),
        FileKind::Document => (
            "SELECT file_path, title FROM documents WHERE id = $1",
            "document",
        ),
    };

    let row: Option<(String, String)> = sqlx::query_as(query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let (relative_path, label) = row.ok_or_else(|| DbError::not_found(resource, id))?;

    // Keep the stored file's extension on the suggested name
    let suggested_name = match Path::new(&relative_path).extension() {
        Some(ext) => format!("{}.{}", label, ext.to_string_lossy()),
        None => label,
    };

    Ok(ResolvedFile {
        relative_path,
        suggested_name,
    })
}

/// A stored path tried to leave the uploads root.
#[derive(Debug, thiserror::Error)]
#[error("path '{path}' escapes the uploads root")]
pub struct PathEscape {
    pub path: String,
}

/// Join a stored relative path onto the uploads root, refusing absolute
/// paths and any `..` traversal. The caller still has to handle a missing
/// file; this check is purely lexical so escape attempts are caught even
/// when nothing exists on disk.
pub fn contain(uploads_root: &Path, relative: &str) -> Result<PathBuf, PathEscape> {
    let candidate = Path::new(relative);
    if candidate.is_absolute() {
        return Err(PathEscape {
            path: relative.to_owned(),
        });
    }
    for component in candidate.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(PathEscape {
                    path: relative.to_owned(),
                })
            }
        }
    }
    Ok(uploads_root.join(candidate))
}

/// Why a contained path could not be opened.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error(transparent)]
    Escape(#[from] PathEscape),
    #[error("file is missing from storage")]
    Missing,
}

/// Resolve a stored relative path to its canonical on-disk location.
///
/// Both the root and the joined path are canonicalized, so a symlink
/// inside the root cannot point out of it. A path that fails to
/// canonicalize has no file behind it.
pub async fn open(uploads_root: &Path, relative: &str) -> Result<PathBuf, OpenError> {
    let joined = contain(uploads_root, relative)?;
    let canonical_root = tokio::fs::canonicalize(uploads_root)
        .await
        .map_err(|_| OpenError::Missing)?;
    let canonical = tokio::fs::canonicalize(&joined)
        .await
        .map_err(|_| OpenError::Missing)?;
    if !canonical.starts_with(&canonical_root) {
        return Err(OpenError::Escape(PathEscape {
            path: relative.to_owned(),
        }));
    }
    Ok(canonical)
}

/// RFC 6266 Content-Disposition with a UTF-8 filename. Downloads are
/// served inline; the browser decides whether to display or save.
///
/// The quoted-string fallback cannot carry `"` or `\`.
pub fn content_disposition(filename: &str) -> String {
    let ascii_fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();
    format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback, encoded
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_wire_names() {
        assert_eq!(
            "member_attachment".parse::<FileKind>().unwrap(),
            FileKind::MemberAttachment
        );
        assert!("passwd".parse::<FileKind>().is_err());
    }

    #[test]
    fn kind_maps_to_module() {
        assert_eq!(FileKind::VehiclePhoto.module(), Module::Vehicles);
        assert_eq!(FileKind::JuniorMemberPhoto.module(), Module::JuniorMembers);
        assert_eq!(FileKind::Document.module(), Module::Documents);
    }

    #[test]
    fn contain_allows_nested_relative_paths() {
        let root = Path::new("/srv/easyvol/uploads");
        let joined = contain(root, "members/abc/photo.jpg").unwrap();
        assert_eq!(joined, root.join("members/abc/photo.jpg"));
    }

    #[test]
    fn contain_rejects_traversal() {
        let root = Path::new("/srv/easyvol/uploads");
        assert!(contain(root, "../../../etc/passwd").is_err());
        assert!(contain(root, "members/../../secret").is_err());
        assert!(contain(root, "/etc/passwd").is_err());
    }

    #[tokio::test]
    async fn open_follows_contained_files() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("members/abc")).unwrap();
        std::fs::write(root.path().join("members/abc/photo.jpg"), b"jpg").unwrap();

        let canonical = open(root.path(), "members/abc/photo.jpg").await.unwrap();
        assert!(canonical.ends_with("members/abc/photo.jpg"));

        assert!(matches!(
            open(root.path(), "members/abc/gone.jpg").await,
            Err(OpenError::Missing)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn open_refuses_symlink_escape() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), b"secret").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            root.path().join("link.txt"),
        )
        .unwrap();

        assert!(matches!(
            open(root.path(), "link.txt").await,
            Err(OpenError::Escape(_))
        ));
    }

    #[test]
    fn disposition_encodes_utf8_names() {
        let header = content_disposition("verbale assemblea 2024.pdf");
        assert!(header.starts_with("inline; "));
        assert!(header.contains("filename=\"verbale assemblea 2024.pdf\""));
        assert!(header.contains("filename*=UTF-8''verbale%20assemblea%202024%2Epdf"));

        let header = content_disposition("libretto è.pdf");
        assert!(header.contains("filename=\"libretto _.pdf\""));
        assert!(header.contains("%C3%A8"));
    }

    #[test]
    fn disposition_fallback_strips_quotes_and_backslashes() {
        let header = content_disposition("rapporto \"annuale\" \\finale.pdf");
        assert!(header.contains("filename=\"rapporto _annuale_ _finale.pdf\""));
        // The extended parameter still carries the full name, percent-encoded
        assert!(header.contains("%22annuale%22"));
    }
}
