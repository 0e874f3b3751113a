//! `SeaORM` entity for the journal_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{EntryStatus, SourceType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entry_number: String,
    pub source_type: SourceType,
    pub source_id: Option<Uuid>,
    pub source_code: Option<String>,
    pub entry_date: Date,
    pub description: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub status: EntryStatus,
    pub posted_at: Option<DateTimeWithTimeZone>,
    pub reversed_by_id: Option<Uuid>,
    pub reverses_id: Option<Uuid>,
    pub reversal_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::journal_lines::Entity")]
    JournalLines,
    #[sea_orm(has_many = "super::audit_events::Entity")]
    AuditEvents,
}

impl Related<super::journal_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalLines.def()
    }
}

impl Related<super::audit_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuditEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
