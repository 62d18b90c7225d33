use crate::config::Config;
use crate::control::pid::PidParams;
use crate::ports::parameter_store::{NotFound, ParameterStore};
use esp_idf_svc::nvs::*;
use esp_idf_sys::EspError;
use postcard::{from_bytes, to_vec};

const MAX_VALUE_SIZE: usize = 512;

#[derive(Debug)]
pub enum Error {
    Timeout,
    EspSys(EspError),
    Serialize(postcard::Error),
    NotFound(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Timeout => write!(f, "Timeout"),
            Error::EspSys(e) => write!(f, "ESP system error: {:?}", e),
            Error::Serialize(e) => write!(f, "Serialization error: {:?}", e),
            Error::NotFound(e) => write!(f, "Not found: {:?}", e),
        }
    }
}

impl std::error::Error for Error {}

pub enum File {
    Config(Config),
    PidParams(PidParams),
    /// Lifetime fill counter (SPEC_FULL §11): persisted across restarts,
    /// unlike the calendar-day counters which the original never tracked
    /// across a day boundary either.
    FillNumber(u64),
}

pub enum FileType {
    Config,
    PidParams,
    FillNumber,
}

impl From<&File> for FileType {
    fn from(file: &File) -> Self {
        match file {
            File::Config(_) => FileType::Config,
            File::PidParams(_) => FileType::PidParams,
            File::FillNumber(_) => FileType::FillNumber,
        }
    }
}

impl FileType {
    fn key(&self) -> String {
        match self {
            FileType::Config => "config".to_string(),
            // matches the original firmware's NVS namespace/key naming
            FileType::PidParams => "pid_params".to_string(),
            FileType::FillNumber => "fill_number".to_string(),
        }
    }

    pub fn load(&self, fs: &KeyValueStore) -> Result<File, Error> {
        let value_buffer: &mut [u8] = &mut [0; MAX_VALUE_SIZE];

        match self {
            FileType::Config => fs
                .storage
                .get_raw(&self.key(), value_buffer)
                .map_err(Error::EspSys)?
                .map(|val| {
                    from_bytes::<Config>(val)
                        .map(File::Config)
                        .map_err(Error::Serialize)
                })
                .transpose()?
                .ok_or(Error::NotFound(self.key())),
            FileType::PidParams => fs
                .storage
                .get_raw(&self.key(), value_buffer)
                .map_err(Error::EspSys)?
                .map(|val| {
                    from_bytes::<PidParams>(val)
                        .map(File::PidParams)
                        .map_err(Error::Serialize)
                })
                .transpose()?
                .ok_or(Error::NotFound(self.key())),
            FileType::FillNumber => fs
                .storage
                .get_raw(&self.key(), value_buffer)
                .map_err(Error::EspSys)?
                .map(|val| {
                    from_bytes::<u64>(val)
                        .map(File::FillNumber)
                        .map_err(Error::Serialize)
                })
                .transpose()?
                .ok_or(Error::NotFound(self.key())),
        }
    }
}

impl File {
    fn key(&self) -> String {
        let file_type: FileType = self.into();
        file_type.key()
    }

    /// Writes the whole value in one `set_raw` call, so a reader can never
    /// observe a partially-written record.
    pub fn save(&self, fs: &mut KeyValueStore) -> Result<(), Error> {
        let value = match self {
            File::Config(config) => {
                to_vec::<Config, MAX_VALUE_SIZE>(config).map_err(Error::Serialize)?
            }
            File::PidParams(params) => {
                to_vec::<PidParams, MAX_VALUE_SIZE>(params).map_err(Error::Serialize)?
            }
            File::FillNumber(n) => to_vec::<u64, MAX_VALUE_SIZE>(n).map_err(Error::Serialize)?,
        };

        fs.storage
            .set_raw(&self.key(), &value)
            .map_err(Error::EspSys)
            .map(|_| ())
    }
}

pub struct KeyValueStore {
    storage: EspNvs<NvsDefault>,
}

impl KeyValueStore {
    pub fn new() -> Result<Self, String> {
        let nvs_default_partition: EspNvsPartition<NvsDefault> = EspDefaultNvsPartition::take()
            .map_err(|e| format!("Couldn't get default partition: {:?}", e))?;

        let namespace = "pump_fill_ctl";
        let nvs = EspNvs::new(nvs_default_partition, namespace, true).map_err(|e| {
            format!(
                "Couldn't get namespace {:?} in default partition: {:?}",
                namespace, e
            )
        })?;
        Ok(Self { storage: nvs })
    }

    pub fn new_blocking(timeout: std::time::Duration) -> Result<Self, Error> {
        let expires = std::time::Instant::now() + timeout;
        loop {
            match Self::new() {
                Ok(store) => return Ok(store),
                Err(_) => {
                    if std::time::Instant::now() > expires {
                        return Err(Error::Timeout);
                    }
                }
            }
        }
    }

    /// Lifetime fill counter (SPEC_FULL §11), read once at boot. Defaults to
    /// 0 the first time the namespace is ever opened.
    pub fn load_fill_number(&self) -> u64 {
        match FileType::FillNumber.load(self) {
            Ok(File::FillNumber(n)) => n,
            _ => 0,
        }
    }

    pub fn save_fill_number(&mut self, n: u64) -> Result<(), Error> {
        File::FillNumber(n).save(self)
    }
}

/// The NVS-backed `pid_params` key doubles as the abstract `ParameterStore`
/// (§4.3): the Control task persists tuned gains through this trait the same
/// way `Config::save`/`try_load` round-trip through `File::Config` above.
impl ParameterStore for KeyValueStore {
    fn load(&self) -> Result<PidParams, NotFound> {
        match FileType::PidParams.load(self) {
            Ok(File::PidParams(params)) => Ok(params),
            _ => Err(NotFound),
        }
    }

    fn save(&mut self, params: PidParams) -> Result<(), NotFound> {
        File::PidParams(params).save(self).map_err(|_| NotFound)
    }
}
