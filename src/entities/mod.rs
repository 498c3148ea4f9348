pub mod alert_receipt;
pub mod care_schedule;
pub mod detection_event;
pub mod notification;
pub mod outbreak_alert;
pub mod pet;
pub mod user;

pub use alert_receipt::Entity as AlertReceipt;
pub use care_schedule::Entity as CareSchedule;
pub use detection_event::Entity as DetectionEvent;
pub use notification::Entity as Notification;
pub use outbreak_alert::Entity as OutbreakAlert;
pub use pet::Entity as Pet;
pub use user::Entity as User;
