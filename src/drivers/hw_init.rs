//! One-time board bring-up: NVS flash and the I2C bus. Everything else is
//! initialised by the driver that owns it.

use crate::error::Error;
use crate::pins;

/// I2C bus clock. The SHT40 is fine at full fast-mode speed.
const I2C_FREQ_HZ: u32 = 400_000;

/// Initialises flash and shared buses. Call exactly once, before any
/// driver is constructed.
#[cfg(feature = "espidf")]
pub fn init_board() -> Result<(), Error> {
    use esp_idf_sys as sys;

    // SAFETY: standard one-time init sequence; re-init after a version
    // mismatch erases and retries, per the IDF docs.
    unsafe {
        let mut rc = sys::nvs_flash_init();
        if rc == sys::ESP_ERR_NVS_NO_FREE_PAGES || rc == sys::ESP_ERR_NVS_NEW_VERSION_FOUND {
            if sys::nvs_flash_erase() != sys::ESP_OK {
                return Err(Error::Init("nvs erase failed"));
            }
            rc = sys::nvs_flash_init();
        }
        if rc != sys::ESP_OK {
            return Err(Error::Init("nvs init failed"));
        }

        let i2c_config = sys::i2c_config_t {
            mode: sys::i2c_mode_t_I2C_MODE_MASTER,
            sda_io_num: pins::I2C_SDA_GPIO,
            scl_io_num: pins::I2C_SCL_GPIO,
            sda_pullup_en: true,
            scl_pullup_en: true,
            __bindgen_anon_1: sys::i2c_config_t__bindgen_ty_1 {
                master: sys::i2c_config_t__bindgen_ty_1__bindgen_ty_1 {
                    clk_speed: I2C_FREQ_HZ,
                },
            },
            ..Default::default()
        };
        if sys::i2c_param_config(0, &i2c_config) != sys::ESP_OK {
            return Err(Error::Init("i2c param config failed"));
        }
        if sys::i2c_driver_install(0, sys::i2c_mode_t_I2C_MODE_MASTER, 0, 0, 0) != sys::ESP_OK {
            return Err(Error::Init("i2c driver install failed"));
        }
    }
    Ok(())
}

#[cfg(not(feature = "espidf"))]
pub fn init_board() -> Result<(), Error> {
    let _ = I2C_FREQ_HZ;
    let _ = pins::I2C_SDA_GPIO;
    Ok(())
}
