pub mod appointments;
pub mod flow;
pub mod gateway;
pub mod reschedule;
pub mod session;

pub use appointments::AppointmentClient;
pub use gateway::{PaymentGateway, PaymentPrefill, PurchaseReceipt};
pub use reschedule::RescheduleSession;
pub use session::BookingSession;
