mod attachment;

pub use attachment::{decode_attachment_list, encode_attachment_list, AttachmentRecord};
