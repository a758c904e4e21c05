//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` against a migrated database when they change.

diesel::table! {
    /// Registered accounts and their generation quota.
    users (id) {
        id -> Uuid,
        /// Unique handle, 3 to 20 characters.
        username -> Varchar,
        /// `hex(salt):hex(key)` scrypt hash.
        password_hash -> Text,
        /// Never negative (CHECK constraint).
        tokens -> Int4,
        last_token_refill -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Projects, unique per `(user_id, slug)`.
    projects (id) {
        id -> Uuid,
        user_id -> Uuid,
        title -> Text,
        slug -> Varchar,
        views -> Int8,
        /// Weak reference to `versions.version_number`.
        pinned_version -> Nullable<Int4>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Immutable page snapshots, unique per `(project_id, version_number)`.
    versions (id) {
        id -> Uuid,
        project_id -> Uuid,
        version_number -> Int4,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(projects -> users (user_id));
diesel::joinable!(versions -> projects (project_id));

diesel::allow_tables_to_appear_in_same_query!(users, projects, versions);
