#[macro_use]
extern crate serde_derive;

pub mod errors;

pub use errors::{ErrorDetails, IndyError, IndyErrorKind, IndyResult};

/// Correlation token passed to every callback-based native entry point and echoed back as
/// the first argument of its completion callback.
pub type CommandHandle = i32;

pub const INVALID_COMMAND_HANDLE: CommandHandle = 0;

/// Status code as it crosses the FFI boundary. Kept as a raw integer because the native
/// library may report codes this crate does not know about.
pub type RawErrorCode = i32;

macro_rules! error_codes {
    ($($(#[$meta:meta])* $name:ident = $value:literal),+ $(,)?) => {
        #[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
        #[repr(i32)]
        pub enum ErrorCode {
            $($(#[$meta])* $name = $value),+
        }

        impl ErrorCode {
            pub fn from_raw(code: RawErrorCode) -> Option<ErrorCode> {
                match code {
                    $($value => Some(ErrorCode::$name),)+
                    _ => None,
                }
            }
        }
    };
}

error_codes! {
    Success = 0,

    // Common errors
    CommonInvalidParam1 = 100,
    CommonInvalidParam2 = 101,
    CommonInvalidParam3 = 102,
    CommonInvalidParam4 = 103,
    CommonInvalidParam5 = 104,
    CommonInvalidParam6 = 105,
    CommonInvalidParam7 = 106,
    CommonInvalidParam8 = 107,
    CommonInvalidParam9 = 108,
    CommonInvalidParam10 = 109,
    CommonInvalidParam11 = 110,
    CommonInvalidParam12 = 111,
    /// Invalid library state was detected in runtime. It signals library bug
    CommonInvalidState = 112,
    /// Object (json, config, key, credential and etc...) passed by library caller has invalid
    /// structure
    CommonInvalidStructure = 113,
    CommonIOError = 114,
    CommonInvalidParam13 = 115,
    CommonInvalidParam14 = 116,
    CommonInvalidParam15 = 117,
    CommonInvalidParam16 = 118,
    CommonInvalidParam17 = 119,
    CommonInvalidParam18 = 120,
    CommonInvalidParam19 = 121,
    CommonInvalidParam20 = 122,
    CommonInvalidParam21 = 123,
    CommonInvalidParam22 = 124,
    CommonInvalidParam23 = 125,
    CommonInvalidParam24 = 126,
    CommonInvalidParam25 = 127,
    CommonInvalidParam26 = 128,
    CommonInvalidParam27 = 129,

    // Wallet errors
    WalletInvalidHandle = 200,
    WalletUnknownTypeError = 201,
    WalletTypeAlreadyRegisteredError = 202,
    WalletAlreadyExistsError = 203,
    WalletNotFoundError = 204,
    WalletIncompatiblePoolError = 205,
    WalletAlreadyOpenedError = 206,
    WalletAccessFailed = 207,
    WalletInputError = 208,
    WalletDecodingError = 209,
    WalletStorageError = 210,
    WalletEncryptionError = 211,
    WalletItemNotFound = 212,
    WalletItemAlreadyExists = 213,
    WalletQueryError = 214,

    // Pool and ledger errors
    PoolLedgerNotCreatedError = 300,
    PoolLedgerInvalidPoolHandle = 301,
    PoolLedgerTerminated = 302,
    LedgerNoConsensusError = 303,
    LedgerInvalidTransaction = 304,
    LedgerSecurityError = 305,
    PoolLedgerConfigAlreadyExistsError = 306,
    PoolLedgerTimeout = 307,
    PoolIncompatibleProtocolVersion = 308,
    LedgerNotFound = 309,

    // Anoncreds errors
    AnoncredsRevocationRegistryFullError = 400,
    AnoncredsInvalidUserRevocId = 401,
    AnoncredsMasterSecretDuplicateNameError = 404,
    AnoncredsProofRejected = 405,
    AnoncredsCredentialRevoked = 406,
    AnoncredsCredDefAlreadyExistsError = 407,

    // Crypto errors
    UnknownCryptoTypeError = 500,

    // Did errors
    DidAlreadyExistsError = 600,
}

impl ErrorCode {
    pub fn is_success(code: RawErrorCode) -> bool {
        code == ErrorCode::Success as RawErrorCode
    }
}

impl From<ErrorCode> for RawErrorCode {
    fn from(code: ErrorCode) -> RawErrorCode {
        code as RawErrorCode
    }
}
