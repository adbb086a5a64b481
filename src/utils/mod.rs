mod fs;
mod hash;

pub use fs::{
    BACKUP_SUFFIX, backup_path, base_name, check_exists_and_is_file, check_is_dir_or_absent,
    first_missing_ancestor, remove_file_if_exists,
};
pub use hash::{BUFFER_SIZE, HashingReader, HashingWriter, hash_length_of, read_window};
