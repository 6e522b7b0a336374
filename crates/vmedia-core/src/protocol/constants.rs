//! OEM raw command constants.
//!
//! Byte values as accepted by the controller firmware. They are an externally
//! fixed protocol and must be matched exactly.

// ============================================================================
// Ampere Falcon (AMI-based firmware), NetFn 0x32
// ============================================================================

/// OEM network function used by every Falcon virtual media command.
pub const FALCON_NETFN: u8 = 0x32;

/// Get a virtual media register (`0x32 0xca <reg>`).
pub const CMD_GET_VMEDIA_REG: u8 = 0xca;
/// Set a virtual media register (`0x32 0xcb <reg> <value>`).
pub const CMD_SET_VMEDIA_REG: u8 = 0xcb;

/// Register: CD/DVD mount enable bit.
pub const REG_MOUNT_STATUS: u8 = 0x00;
/// Register: number of virtual CD slots.
pub const REG_DEVICE_COUNT_CD: u8 = 0x04;
/// Register: number of virtual floppy slots.
pub const REG_DEVICE_COUNT_FD: u8 = 0x05;
/// Register: number of virtual hard-disk slots.
pub const REG_DEVICE_COUNT_HD: u8 = 0x06;
/// Register: "Remote Media Support" feature bit.
pub const REG_VMEDIA_STATUS: u8 = 0x08;
/// Register: media service restart trigger.
pub const REG_VMEDIA_RESTART: u8 = 0x0a;

/// Remote Image Service command.
pub const CMD_RIS: u8 = 0x9f;
/// RIS selector for the CD media configuration block.
pub const RIS_SEL_CD: u8 = 0x01;
/// RIS selector for the service itself.
pub const RIS_SEL_SERVICE: u8 = 0x08;
/// RIS parameter: path / progress block.
pub const RIS_PARAM_PATH: u8 = 0x01;
/// RIS parameter: share server address.
pub const RIS_PARAM_SERVER: u8 = 0x02;
/// RIS parameter: share type.
pub const RIS_PARAM_SHARE_TYPE: u8 = 0x05;
/// RIS parameter: restart.
pub const RIS_PARAM_RESTART: u8 = 0x0b;
/// RIS parameter: clear configuration.
pub const RIS_PARAM_CLEAR: u8 = 0x0d;
/// Share type payload, ASCII `nfs`.
pub const RIS_SHARE_TYPE_NFS: &[u8] = b"nfs";

/// Image redirection command (`0x32 0xd7`).
pub const CMD_REDIRECT: u8 = 0xd7;
/// Image status command (`0x32 0xd8`).
pub const CMD_IMAGE_STATUS: u8 = 0xd8;

/// Prefix of "set image name" / "stop redirection" payloads.
pub const REDIRECT_CD_PREFIX: [u8; 3] = [0x01, 0x01, 0x01];
/// Start redirection with the given image name.
pub const REDIRECT_START: u8 = 0x01;
/// Stop redirection on a slot index.
pub const REDIRECT_STOP: u8 = 0x00;

/// Payload of "get mounted image count".
pub const IMAGE_COUNT_QUERY: [u8; 2] = [0x00, 0x01];
/// Payload of "check NFS service status".
pub const NFS_SERVICE_QUERY: [u8; 4] = [0x06, 0x01, 0x01, 0x00];

/// Highest number of slots the firmware accepts per media type.
pub const MAX_DEVICE_SLOTS: u8 = 4;

// ============================================================================
// Nokia HW17, NetFn 0x3c
// ============================================================================

/// OEM network function of the HW17 family.
pub const HW17_NETFN: u8 = 0x3c;
/// Stop virtual device and clear NFS configuration.
pub const HW17_CMD_CLEAR: u8 = 0x00;
/// Set an NFS configuration field.
pub const HW17_CMD_SET_CONFIG: u8 = 0x01;
/// Start or stop the NFS service.
pub const HW17_CMD_SERVICE: u8 = 0x02;
/// Read NFS service status.
pub const HW17_CMD_STATUS: u8 = 0x03;

/// HW17 configuration field: server IP.
pub const HW17_FIELD_SERVER: u8 = 0x00;
/// HW17 configuration field: mount root path.
pub const HW17_FIELD_ROOT_PATH: u8 = 0x01;
/// HW17 configuration field: image name.
pub const HW17_FIELD_IMAGE: u8 = 0x02;

/// HW17 status byte: image mounted.
pub const HW17_STATUS_MOUNTED: u8 = 0x00;
/// HW17 status byte: NFS error.
pub const HW17_STATUS_NFS_ERROR: u8 = 0x20;
/// HW17 status byte: mount in progress.
pub const HW17_STATUS_MOUNTING: u8 = 0x64;
