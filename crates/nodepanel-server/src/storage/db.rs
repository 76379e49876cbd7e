//! `SQLite` database handle for the panel.

pub use nodepanel_core::db::DatabaseError;

nodepanel_core::define_database!(PanelDatabase, "Panel database migrations complete");
