//! XML utilities.

mod serialize;
mod utils;

pub use serialize::{serialize_children, serialize_element};
pub use utils::{
    element_children, find_by_path, find_child, find_children, get_tag_name, get_text, has_tag,
};
