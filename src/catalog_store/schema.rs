//! Table declarations for the catalog database.
//!
//! The `*_V1` tables are the first-generation layout every catalog starts
//! from. Columns added by later migrations are declared once as constants
//! so the migration step and the latest layout share the same definition.
//! `CATALOG_TABLES` is the layout a fully migrated catalog must match;
//! `ALTER TABLE ... ADD COLUMN` appends, so column order there follows the
//! order in which versions introduced each column.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, ForeignKeyOnChange, SqlType, Table};

type ColumnDef = Column<'static, &'static str>;

const ARTISTS_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::NoAction,
};

const ALBUMS_FK: ForeignKey = ForeignKey {
    foreign_table: "albums",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::NoAction,
};

// =============================================================================
// Version 1 - first-generation tables
// =============================================================================

pub const DIRECTORIES_TABLE_V1: Table = Table {
    name: "directories",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("path", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const LIBRARY_DATA_TABLE_V1: Table = Table {
    name: "library_data",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "init",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const CONFIG_DATA_TABLE_V1: Table = Table {
    name: "config_data",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "skip_not_needed_tracks",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "try_embed_lyrics",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const ARTISTS_TABLE_V1: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const ALBUMS_TABLE_V1: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            foreign_key = Some(&ARTISTS_FK)
        ),
        sqlite_column!("image_path", &SqlType::Text),
        sqlite_column!("artist_name", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const TRACKS_TABLE_V1: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("file_path", &SqlType::Text, non_null = true),
        sqlite_column!("file_name", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("album_name", &SqlType::Text),
        sqlite_column!("artist_name", &SqlType::Text),
        sqlite_column!(
            "album_id",
            &SqlType::Integer,
            foreign_key = Some(&ALBUMS_FK)
        ),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            foreign_key = Some(&ARTISTS_FK)
        ),
        sqlite_column!("image_path", &SqlType::Text),
        sqlite_column!(
            "duration",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("lrc_lyrics", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const TABLES_V1: &[Table] = &[
    DIRECTORIES_TABLE_V1,
    LIBRARY_DATA_TABLE_V1,
    CONFIG_DATA_TABLE_V1,
    ARTISTS_TABLE_V1,
    ALBUMS_TABLE_V1,
    TRACKS_TABLE_V1,
];

// =============================================================================
// Columns added by later versions
// =============================================================================

// v2
pub const TRACKS_TXT_LYRICS: ColumnDef = sqlite_column!("txt_lyrics", &SqlType::Text);

// v3
pub const TRACKS_INSTRUMENTAL: ColumnDef = sqlite_column!(
    "instrumental",
    &SqlType::Integer,
    non_null = true,
    default_value = Some("0")
);

// v4
pub const TRACKS_TITLE_LOWER: ColumnDef = sqlite_column!("title_lower", &SqlType::Text);
pub const NAME_LOWER: ColumnDef = sqlite_column!("name_lower", &SqlType::Text);

// v5
pub const TRACKS_TRACK_NUMBER: ColumnDef = sqlite_column!("track_number", &SqlType::Integer);
pub const ALBUM_ARTIST_NAME: ColumnDef = sqlite_column!("album_artist_name", &SqlType::Text);
pub const ALBUMS_ALBUM_ARTIST_NAME_LOWER: ColumnDef =
    sqlite_column!("album_artist_name_lower", &SqlType::Text);
pub const CONFIG_THEME_MODE: ColumnDef = sqlite_column!(
    "theme_mode",
    &SqlType::Text,
    non_null = true,
    default_value = Some("'auto'")
);
pub const CONFIG_LRCLIB_INSTANCE: ColumnDef = sqlite_column!(
    "lrclib_instance",
    &SqlType::Text,
    non_null = true,
    default_value = Some("'https://lrclib.net'")
);

// v6
pub const CONFIG_SKIP_SYNCED: ColumnDef = sqlite_column!(
    "skip_tracks_with_synced_lyrics",
    &SqlType::Integer,
    non_null = true,
    default_value = Some("0")
);
pub const CONFIG_SKIP_PLAIN: ColumnDef = sqlite_column!(
    "skip_tracks_with_plain_lyrics",
    &SqlType::Integer,
    non_null = true,
    default_value = Some("0")
);
pub const CREATED_AT: ColumnDef = sqlite_column!("created_at", &SqlType::Integer);
pub const UPDATED_AT: ColumnDef = sqlite_column!("updated_at", &SqlType::Integer);

// v7
pub const CONFIG_SHOW_LINE_COUNT: ColumnDef = sqlite_column!(
    "show_line_count",
    &SqlType::Integer,
    non_null = true,
    default_value = Some("1")
);

/// Tables stamped with created_at/updated_at in v6.
pub const TIMESTAMPED_TABLES: &[&str] = &[
    "directories",
    "library_data",
    "config_data",
    "artists",
    "albums",
    "tracks",
];

// =============================================================================
// Latest layout (v8)
// =============================================================================

pub const DIRECTORIES_TABLE: Table = Table {
    name: "directories",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("path", &SqlType::Text, non_null = true),
        CREATED_AT,
        UPDATED_AT,
    ],
    indices: &[],
    unique_constraints: &[&["path"]],
};

pub const LIBRARY_DATA_TABLE: Table = Table {
    name: "library_data",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "init",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        CREATED_AT,
        UPDATED_AT,
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const CONFIG_DATA_TABLE: Table = Table {
    name: "config_data",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "skip_not_needed_tracks",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "try_embed_lyrics",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        CONFIG_THEME_MODE,
        CONFIG_LRCLIB_INSTANCE,
        CONFIG_SKIP_SYNCED,
        CONFIG_SKIP_PLAIN,
        CREATED_AT,
        UPDATED_AT,
        CONFIG_SHOW_LINE_COUNT,
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        NAME_LOWER,
        CREATED_AT,
        UPDATED_AT,
    ],
    indices: &[
        ("idx_artists_name", "name"),
        ("idx_artists_name_lower", "name_lower"),
    ],
    unique_constraints: &[&["name"]],
};

pub const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            foreign_key = Some(&ARTISTS_FK)
        ),
        sqlite_column!("image_path", &SqlType::Text),
        sqlite_column!("artist_name", &SqlType::Text),
        NAME_LOWER,
        ALBUM_ARTIST_NAME,
        ALBUMS_ALBUM_ARTIST_NAME_LOWER,
        CREATED_AT,
        UPDATED_AT,
    ],
    indices: &[
        ("idx_albums_name", "name"),
        ("idx_albums_name_lower", "name_lower"),
        ("idx_albums_album_artist_name_lower", "album_artist_name_lower"),
    ],
    unique_constraints: &[&["name", "artist_id"]],
};

pub const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("file_path", &SqlType::Text, non_null = true),
        sqlite_column!("file_name", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("album_name", &SqlType::Text),
        sqlite_column!("artist_name", &SqlType::Text),
        sqlite_column!(
            "album_id",
            &SqlType::Integer,
            foreign_key = Some(&ALBUMS_FK)
        ),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            foreign_key = Some(&ARTISTS_FK)
        ),
        sqlite_column!("image_path", &SqlType::Text),
        sqlite_column!(
            "duration",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("lrc_lyrics", &SqlType::Text),
        TRACKS_TXT_LYRICS,
        TRACKS_INSTRUMENTAL,
        TRACKS_TITLE_LOWER,
        TRACKS_TRACK_NUMBER,
        ALBUM_ARTIST_NAME,
        CREATED_AT,
        UPDATED_AT,
    ],
    indices: &[
        ("idx_tracks_title", "title"),
        ("idx_tracks_title_lower", "title_lower"),
        ("idx_tracks_track_number", "track_number"),
        ("idx_tracks_album_id", "album_id"),
        ("idx_tracks_artist_id", "artist_id"),
    ],
    unique_constraints: &[],
};

/// What a catalog at the current version must look like.
pub const CATALOG_TABLES: &[Table] = &[
    DIRECTORIES_TABLE,
    LIBRARY_DATA_TABLE,
    CONFIG_DATA_TABLE,
    ARTISTS_TABLE,
    ALBUMS_TABLE,
    TRACKS_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn v1_tables_create_and_validate() {
        let conn = Connection::open_in_memory().unwrap();
        for table in TABLES_V1 {
            table.create(&conn).unwrap();
        }
        for table in TABLES_V1 {
            table.validate(&conn).unwrap();
        }
    }

    #[test]
    fn latest_tables_create_and_validate() {
        let conn = Connection::open_in_memory().unwrap();
        for table in CATALOG_TABLES {
            table.create(&conn).unwrap();
        }
        for table in CATALOG_TABLES {
            table.validate(&conn).unwrap();
        }
    }

    #[test]
    fn latest_layout_extends_v1_in_order() {
        for (v1, latest) in TABLES_V1.iter().zip(CATALOG_TABLES.iter()) {
            assert_eq!(v1.name, latest.name);
            for (old, new) in v1.columns.iter().zip(latest.columns.iter()) {
                assert_eq!(old.name, new.name, "table {}", v1.name);
            }
            assert!(latest.columns.len() > v1.columns.len());
        }
    }
}
