//! Command catalog: semantic operations to exact OEM frames.
//!
//! Pure functions; the only failures are argument validation. The state
//! machine never builds wire bytes itself.

use super::command::{CommandError, MediaType, RawCommand};
use super::constants::*;

fn non_empty<'a>(value: &'a str, what: &'static str) -> Result<&'a [u8], CommandError> {
    if value.is_empty() {
        return Err(CommandError::EmptyArgument(what));
    }
    Ok(value.as_bytes())
}

fn with_tail(head: &[u8], tail: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(head.len() + tail.len());
    data.extend_from_slice(head);
    data.extend_from_slice(tail);
    data
}

/// Ampere Falcon command set.
pub mod falcon {
    use super::*;

    fn device_register(media: MediaType) -> u8 {
        match media {
            MediaType::Cd => REG_DEVICE_COUNT_CD,
            MediaType::Floppy => REG_DEVICE_COUNT_FD,
            MediaType::HardDisk => REG_DEVICE_COUNT_HD,
        }
    }

    fn get_reg(reg: u8) -> RawCommand {
        RawCommand::new(FALCON_NETFN, CMD_GET_VMEDIA_REG, [reg])
    }

    fn set_reg(reg: u8, value: u8) -> RawCommand {
        RawCommand::new(FALCON_NETFN, CMD_SET_VMEDIA_REG, [reg, value])
    }

    fn ris(data: Vec<u8>) -> RawCommand {
        RawCommand::new(FALCON_NETFN, CMD_RIS, data)
    }

    /// Read the number of enabled slots of a media type.
    pub fn get_device_slots(media: MediaType) -> RawCommand {
        get_reg(device_register(media))
    }

    /// Set the number of enabled slots of a media type.
    pub fn set_device_slots(media: MediaType, count: u8) -> Result<RawCommand, CommandError> {
        media.check_slot_count(count)?;
        Ok(set_reg(device_register(media), count))
    }

    pub fn get_mount_bit() -> RawCommand {
        get_reg(REG_MOUNT_STATUS)
    }

    pub fn set_mount_bit(enabled: bool) -> RawCommand {
        set_reg(REG_MOUNT_STATUS, u8::from(enabled))
    }

    pub fn get_media_service() -> RawCommand {
        get_reg(REG_VMEDIA_STATUS)
    }

    pub fn set_media_service(enabled: bool) -> RawCommand {
        set_reg(REG_VMEDIA_STATUS, u8::from(enabled))
    }

    pub fn restart_media_service() -> RawCommand {
        set_reg(REG_VMEDIA_RESTART, 0x01)
    }

    pub fn set_share_type_nfs() -> RawCommand {
        ris(with_tail(
            &[RIS_SEL_CD, RIS_PARAM_SHARE_TYPE, 0x00],
            RIS_SHARE_TYPE_NFS,
        ))
    }

    pub fn set_share_server(server: &str) -> Result<RawCommand, CommandError> {
        let server = non_empty(server, "server address")?;
        Ok(ris(with_tail(&[RIS_SEL_CD, RIS_PARAM_SERVER, 0x00], server)))
    }

    pub fn set_share_path(path: &str) -> Result<RawCommand, CommandError> {
        let path = non_empty(path, "share path")?;
        Ok(ris(with_tail(&[RIS_SEL_CD, RIS_PARAM_PATH, 0x01], path)))
    }

    /// The progress flag gates path writes on this firmware.
    pub fn set_progress_flag(set: bool) -> RawCommand {
        ris(vec![RIS_SEL_CD, RIS_PARAM_PATH, 0x00, u8::from(set)])
    }

    pub fn clear_remote_image_config() -> RawCommand {
        ris(vec![RIS_SEL_CD, RIS_PARAM_CLEAR])
    }

    pub fn restart_remote_image_service() -> RawCommand {
        ris(vec![RIS_SEL_SERVICE, RIS_PARAM_RESTART])
    }

    pub fn restart_remote_image_cd() -> RawCommand {
        ris(vec![RIS_SEL_CD, RIS_PARAM_RESTART, 0x01])
    }

    pub fn get_mounted_image_count() -> RawCommand {
        RawCommand::new(FALCON_NETFN, CMD_IMAGE_STATUS, IMAGE_COUNT_QUERY)
    }

    pub fn check_nfs_service() -> RawCommand {
        RawCommand::new(FALCON_NETFN, CMD_IMAGE_STATUS, NFS_SERVICE_QUERY)
    }

    pub fn set_image_name(filename: &str) -> Result<RawCommand, CommandError> {
        let name = non_empty(filename, "image name")?;
        let mut head = REDIRECT_CD_PREFIX.to_vec();
        head.push(REDIRECT_START);
        Ok(RawCommand::new(
            FALCON_NETFN,
            CMD_REDIRECT,
            with_tail(&head, name),
        ))
    }

    pub fn stop_redirection(slot: u8) -> Result<RawCommand, CommandError> {
        if slot >= MAX_DEVICE_SLOTS {
            return Err(CommandError::SlotCountOutOfRange {
                count: slot,
                max: MAX_DEVICE_SLOTS - 1,
            });
        }
        let mut data = REDIRECT_CD_PREFIX.to_vec();
        data.extend_from_slice(&[REDIRECT_STOP, slot]);
        Ok(RawCommand::new(FALCON_NETFN, CMD_REDIRECT, data))
    }
}

/// Nokia HW17 command set.
pub mod hw17 {
    use super::*;

    fn config_field(field: u8, value: &[u8]) -> RawCommand {
        let mut data = vec![field];
        data.extend_from_slice(value);
        data.push(0x00);
        RawCommand::new(HW17_NETFN, HW17_CMD_SET_CONFIG, data)
    }

    /// Stops the virtual device and clears the NFS configuration.
    pub fn clear() -> RawCommand {
        RawCommand::new(HW17_NETFN, HW17_CMD_CLEAR, Vec::new())
    }

    pub fn set_server(server: &str) -> Result<RawCommand, CommandError> {
        Ok(config_field(
            HW17_FIELD_SERVER,
            non_empty(server, "server address")?,
        ))
    }

    pub fn set_root_path(path: &str) -> Result<RawCommand, CommandError> {
        Ok(config_field(
            HW17_FIELD_ROOT_PATH,
            non_empty(path, "share path")?,
        ))
    }

    pub fn set_image(filename: &str) -> Result<RawCommand, CommandError> {
        Ok(config_field(
            HW17_FIELD_IMAGE,
            non_empty(filename, "image name")?,
        ))
    }

    pub fn start_service() -> RawCommand {
        RawCommand::new(HW17_NETFN, HW17_CMD_SERVICE, [0x01])
    }

    pub fn service_status() -> RawCommand {
        RawCommand::new(HW17_NETFN, HW17_CMD_STATUS, Vec::new())
    }
}
