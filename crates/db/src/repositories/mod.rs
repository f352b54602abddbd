//! Repositories: one zero-sized struct per table (or tight table group) with
//! async functions taking a `&PgPool`.

pub mod category_repo;
pub mod item_repo;
pub mod member_event_repo;
pub mod member_lookup_repo;
pub mod member_repo;
pub mod notification_repo;
pub mod order_repo;
pub mod order_status_repo;
pub mod orderable_item_repo;
pub mod parent_repo;
pub mod permission_repo;
pub mod qualification_repo;
pub mod service_repo;
pub mod session_repo;
pub mod settings_repo;
pub mod stock_repo;
pub mod storage_location_repo;
pub mod transaction_repo;
pub mod user_repo;

pub use category_repo::CategoryRepo;
pub use item_repo::{ItemRepo, ItemVariantRepo};
pub use member_event_repo::MemberEventRepo;
pub use member_lookup_repo::{EventTypeRepo, MemberGroupRepo, MemberStatusRepo};
pub use member_repo::MemberRepo;
pub use notification_repo::{EmailTemplateRepo, NotificationLogRepo, NotificationPreferenceRepo};
pub use order_repo::{OrderItemRepo, OrderRepo};
pub use order_status_repo::OrderStatusRepo;
pub use orderable_item_repo::OrderableItemRepo;
pub use parent_repo::ParentRepo;
pub use permission_repo::PermissionRepo;
pub use qualification_repo::{
    OwnerScope, QualificationRepo, QualificationTypeRepo, SpecialTaskRepo, SpecialTaskTypeRepo,
};
pub use service_repo::{AttendanceRepo, ServiceRepo};
pub use session_repo::SessionRepo;
pub use settings_repo::{PreferenceRepo, SettingsCategoryRepo};
pub use stock_repo::StockRepo;
pub use storage_location_repo::StorageLocationRepo;
pub use transaction_repo::TransactionRepo;
pub use user_repo::UserRepo;
