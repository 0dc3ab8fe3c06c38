pub mod booking_form;
pub mod counter;
pub mod gate;
pub mod lister;
pub mod notifier;
pub mod quicklink;
pub mod transitions;
