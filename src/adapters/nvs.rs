//! NVS-backed persistence.
//!
//! One namespace holds everything: the active preset under a fixed key as
//! a postcard blob, and the battery node's wake-to-wake state under its
//! own key. The host build substitutes an in-memory map so every
//! persistence path runs in tests.

use log::{info, warn};

use crate::app::ports::{PresetPort, StoragePort};
use crate::config::Preset;
use crate::error::Error;

/// NVS namespace owned by this firmware.
pub const NVS_NAMESPACE: &str = "vivaria";

/// Key of the active-preset blob.
const PRESET_KEY: &str = "preset";

/// Upper bound for a serialised preset. Presets are small; a blob larger
/// than this is corrupt.
const PRESET_BLOB_MAX: usize = 256;

pub struct NvsStorage {
    #[cfg(feature = "espidf")]
    handle: esp_idf_sys::nvs_handle_t,
    #[cfg(not(feature = "espidf"))]
    blobs: std::collections::HashMap<std::string::String, std::vec::Vec<u8>>,
}

impl NvsStorage {
    #[cfg(feature = "espidf")]
    pub fn open() -> Result<Self, Error> {
        use esp_idf_sys as sys;

        let namespace = core::ffi::CStr::from_bytes_with_nul(b"vivaria\0")
            .map_err(|_| Error::Init("bad namespace"))?;
        let mut handle: sys::nvs_handle_t = 0;
        // SAFETY: namespace string is NUL-terminated and outlives the call.
        let rc = unsafe {
            sys::nvs_open(
                namespace.as_ptr(),
                sys::nvs_open_mode_t_NVS_READWRITE,
                &mut handle,
            )
        };
        if rc != sys::ESP_OK {
            return Err(Error::Init("nvs open failed"));
        }
        Ok(Self { handle })
    }

    #[cfg(not(feature = "espidf"))]
    pub fn open() -> Result<Self, Error> {
        Ok(Self {
            blobs: std::collections::HashMap::new(),
        })
    }
}

impl StoragePort for NvsStorage {
    #[cfg(feature = "espidf")]
    fn get_blob(&mut self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, Error> {
        use esp_idf_sys as sys;

        let mut key_buf = [0u8; 16];
        let key_c = to_cstr(key, &mut key_buf)?;

        let mut len = buf.len();
        // SAFETY: key is NUL-terminated, buf/len describe a valid region.
        let rc = unsafe {
            sys::nvs_get_blob(
                self.handle,
                key_c,
                buf.as_mut_ptr().cast(),
                &mut len,
            )
        };
        match rc {
            sys::ESP_OK => Ok(Some(len)),
            sys::ESP_ERR_NVS_NOT_FOUND => Ok(None),
            _ => Err(Error::Config("nvs blob read failed")),
        }
    }

    #[cfg(feature = "espidf")]
    fn set_blob(&mut self, key: &str, value: &[u8]) -> Result<(), Error> {
        use esp_idf_sys as sys;

        let mut key_buf = [0u8; 16];
        let key_c = to_cstr(key, &mut key_buf)?;

        // SAFETY: key is NUL-terminated, value describes a valid region.
        unsafe {
            if sys::nvs_set_blob(self.handle, key_c, value.as_ptr().cast(), value.len())
                != sys::ESP_OK
            {
                return Err(Error::Config("nvs blob write failed"));
            }
            if sys::nvs_commit(self.handle) != sys::ESP_OK {
                return Err(Error::Config("nvs commit failed"));
            }
        }
        Ok(())
    }

    #[cfg(not(feature = "espidf"))]
    fn get_blob(&mut self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, Error> {
        match self.blobs.get(key) {
            Some(v) if v.len() <= buf.len() => {
                buf[..v.len()].copy_from_slice(v);
                Ok(Some(v.len()))
            }
            Some(_) => Err(Error::Config("nvs blob read failed")),
            None => Ok(None),
        }
    }

    #[cfg(not(feature = "espidf"))]
    fn set_blob(&mut self, key: &str, value: &[u8]) -> Result<(), Error> {
        self.blobs.insert(key.into(), value.to_vec());
        Ok(())
    }
}

#[cfg(feature = "espidf")]
fn to_cstr<'a>(s: &str, buf: &'a mut [u8]) -> Result<*const core::ffi::c_char, Error> {
    if s.len() + 1 > buf.len() {
        return Err(Error::Config("nvs key too long"));
    }
    buf[..s.len()].copy_from_slice(s.as_bytes());
    buf[s.len()] = 0;
    Ok(buf.as_ptr().cast())
}

impl PresetPort for NvsStorage {
    /// Loads and validates the stored preset. An unreadable or invalid
    /// blob is reported as absent so the caller falls back to the species
    /// default rather than refusing to boot.
    fn load(&mut self) -> Result<Option<Preset>, Error> {
        let mut buf = [0u8; PRESET_BLOB_MAX];
        let len = match self.get_blob(PRESET_KEY, &mut buf)? {
            Some(len) => len,
            None => return Ok(None),
        };

        let preset: Preset = match postcard::from_bytes(&buf[..len]) {
            Ok(p) => p,
            Err(_) => {
                warn!("stored preset blob is corrupt, ignoring");
                return Ok(None);
            }
        };
        if let Err(e) = preset.validate() {
            warn!("stored preset is invalid ({e}), ignoring");
            return Ok(None);
        }
        info!("loaded preset '{}'", preset.species.as_str());
        Ok(Some(preset))
    }

    fn save(&mut self, preset: &Preset) -> Result<(), Error> {
        preset.validate()?;
        let mut buf = [0u8; PRESET_BLOB_MAX];
        let written = postcard::to_slice(preset, &mut buf)
            .map_err(|_| Error::Config("preset serialise failed"))?;
        self.set_blob(PRESET_KEY, written)?;
        info!("saved preset '{}'", preset.species.as_str());
        Ok(())
    }
}

/// Loads the stored preset or falls back to the species default.
pub fn load_or_default(storage: &mut NvsStorage) -> Preset {
    match storage.load() {
        Ok(Some(preset)) => preset,
        Ok(None) => {
            info!("no stored preset, using default");
            Preset::default()
        }
        Err(e) => {
            warn!("preset load failed ({e}), using default");
            Preset::default()
        }
    }
}
