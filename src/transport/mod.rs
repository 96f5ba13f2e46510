//! Transport layer: HTTP and wire-format details (serialization/deserialization).

mod messages_mime;

pub use messages_mime::{
    MESSAGE_FILENAME, MESSAGE_PART, MimeForm, decode_messages_mime_json_response,
    encode_messages_mime_form,
};
