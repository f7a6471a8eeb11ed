//! Help text for the `?` command.

pub(crate) const HELP: &[&str] = &[
    "GPIB to USB converter v4\r\n\r\n",
    "Transmit commands, OK/TIMEOUT/ERROR\r\n",
    "  <D> Data (ATN false), <M> Data without EOI\r\n",
    "  <C> Command (ATN true)\r\n",
    "  <T> Hex transmit (0C - command, 0D - data)\r\n",
    "Receive commands (receives until EOI,max 127 bytes)\r\n",
    "  <X> ASCII, <payload> or TIMEOUT\r\n",
    "  <Y> BINARY, <length><payload>\r\n",
    "  <Z> HEX, <length><payload>\r\n",
    "  <P> Continous read (plotter mode)\r\n",
    "General commands\r\n",
    "  <A> Set/get converter talk address\r\n",
    "  <S> Get REQ/SRQ/LISTEN state (1 if true)\r\n",
    "  <R> Set REMOTE mode (REN true)\r\n",
    "  <L> Set LOCAL mode (REN false)\r\n",
    "  <I> Generate IFC pulse\r\n",
    "  <E> Get/set echo on(E1)/off(E0)\r\n",
    "  <Q> Set/get message end sequence (Q0-Q3)\r\n",
    "  <H> Commands history\r\n",
];
