pub mod key_name_to_evdev_code;

pub use key_name_to_evdev_code::KeyNameToEvdevCode;
