// Code - Stable response codes
//
// Numeric values are part of the protocol: clients match on them, never
// renumber.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Code {
    Ok = 0,

    // Structural, sequencing, economic
    WrongNonce = 101,
    CoinNotExists = 102,
    CoinReserveNotSufficient = 103,
    TxTooLarge = 105,
    DecodeError = 106,
    InsufficientFunds = 107,
    TxPayloadTooLarge = 109,
    TxServiceDataTooLarge = 110,
    TxFromSenderAlreadyInMempool = 113,
    TooLowGasPrice = 114,
    WrongChainId = 115,
    CoinReserveUnderflow = 116,
    UnknownTxKind = 117,
    InsufficientStake = 118,
    CommissionCoinNotSufficient = 119,

    // Conversion
    CrossConvert = 301,
    MaximumValueToSellReached = 302,
    MinimumValueToBuyReached = 303,

    // Multisig
    MultisigNotExists = 601,
    MultisigExists = 602,
    IncorrectMultiSignature = 603,
    TooLargeOwnersList = 604,
    DuplicatedAddresses = 605,
    DifferentCountAddressesAndWeights = 606,
    IncorrectTotalWeights = 607,
    NotEnoughMultisigVotes = 608,
    IncorrectWeights = 609,

    // Exchange
    PairNotExists = 700,
    PairAlreadyExists = 701,
    InsufficientInputAmount = 702,
    InsufficientLiquidity = 703,
    InsufficientLiquidityMinted = 704,
    InsufficientLiquidityBurned = 705,
    InsufficientLiquidityBalance = 706,
    InsufficientOutputAmount = 707,
    DuplicatePoolInRoute = 708,
    TooLongSwapRoute = 709,
    WrongOrderPrice = 710,
    OrderNotExists = 711,
    IsNotOwnerOfOrder = 712,
    OrderVolumeTooSmall = 713,
}

impl Code {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn is_ok(self) -> bool {
        self == Code::Ok
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}
